use bytes::Bytes;
use futures_core::Stream;
use std::pin::Pin;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Single byte range requested by a reader.
///
/// `length: None` means "from `offset` to the end of the object".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: Option<u64>,
}

impl ByteRange {
    pub fn new(offset: u64, length: Option<u64>) -> Self {
        Self { offset, length }
    }

    /// Open-ended range starting at `offset`
    pub fn from_offset(offset: u64) -> Self {
        Self {
            offset,
            length: None,
        }
    }

    /// Range covering `start..=end`. Returns `None` when `end < start`.
    pub fn inclusive(start: u64, end: u64) -> Option<Self> {
        let length = end.checked_sub(start)?.checked_add(1)?;
        Some(Self {
            offset: start,
            length: Some(length),
        })
    }

    /// Resolve against an object of `total_size` bytes.
    ///
    /// Returns `None` when the range cannot be satisfied (offset at or past the
    /// end, or an empty object); callers then serve the whole object. An end
    /// past the last byte is clamped.
    pub fn resolve(&self, total_size: u64) -> Option<ResolvedRange> {
        if total_size == 0 || self.offset >= total_size {
            return None;
        }
        let last = total_size - 1;
        let end = match self.length {
            Some(0) => return None,
            Some(length) => self.offset.saturating_add(length - 1).min(last),
            None => last,
        };
        Some(ResolvedRange {
            start: self.offset,
            end,
            total_size,
        })
    }

    /// Render as an HTTP `Range` header value
    pub fn to_header_value(&self) -> String {
        match self.length {
            Some(length) => format!(
                "bytes={}-{}",
                self.offset,
                self.offset.saturating_add(length.saturating_sub(1))
            ),
            None => format!("bytes={}-", self.offset),
        }
    }
}

/// Range a store actually served. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

impl ResolvedRange {
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value, e.g. `bytes 0-99/1000`
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }

    /// Parse a `Content-Range` value as returned by S3-compatible stores
    pub fn parse_content_range(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes ")?;
        let (span, total) = rest.split_once('/')?;
        let (start, end) = span.split_once('-')?;
        let range = Self {
            start: start.parse().ok()?,
            end: end.parse().ok()?,
            total_size: total.parse().ok()?,
        };
        (range.start <= range.end && range.end < range.total_size).then_some(range)
    }
}

/// Entity-tag preconditions for a read, kept as raw header values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
}

/// Result of evaluating [`Conditions`] against an object's etag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionCheck {
    Proceed,
    NotModified,
    PreconditionFailed,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_if_match<S: Into<String>>(mut self, value: S) -> Self {
        self.if_match = Some(value.into());
        self
    }

    pub fn with_if_none_match<S: Into<String>>(mut self, value: S) -> Self {
        self.if_none_match = Some(value.into());
        self
    }

    /// Evaluate against an unquoted etag.
    ///
    /// `If-Match` is checked first with strong comparison, then
    /// `If-None-Match` with weak comparison.
    pub fn evaluate(&self, etag: &str) -> ConditionCheck {
        if let Some(if_match) = &self.if_match {
            if !etag_list_matches(if_match, etag, false) {
                return ConditionCheck::PreconditionFailed;
            }
        }
        if let Some(if_none_match) = &self.if_none_match {
            if etag_list_matches(if_none_match, etag, true) {
                return ConditionCheck::NotModified;
            }
        }
        ConditionCheck::Proceed
    }
}

fn etag_list_matches(header: &str, etag: &str, weak: bool) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return true;
        }
        let is_weak = candidate.starts_with("W/");
        if is_weak && !weak {
            return false;
        }
        let candidate = candidate.trim_start_matches("W/").trim_matches('"');
        candidate == etag
    })
}

/// Options for a read
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub range: Option<ByteRange>,
    pub conditions: Conditions,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }
}
