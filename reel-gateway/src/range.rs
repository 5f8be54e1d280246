use axum::http::{header, HeaderMap};
use reel_blob::ByteRange;

/// What a request's `Range` header asks for.
///
/// Only `bytes=<start>-<end>?` is understood. Everything else is
/// [`RangeRequest::Unsupported`] and gets the whole object, never a 4xx, so
/// players sending unusual range syntax keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    Absent,
    Unsupported,
    Single(ByteRange),
}

impl RangeRequest {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match headers.get(header::RANGE) {
            None => Self::Absent,
            Some(value) => match value.to_str() {
                Ok(value) => Self::parse(value),
                Err(_) => Self::Unsupported,
            },
        }
    }

    pub fn parse(value: &str) -> Self {
        match parse_single(value) {
            Some(range) => Self::Single(range),
            None => {
                tracing::debug!(range = %value, "Unsupported Range header, serving full object");
                Self::Unsupported
            }
        }
    }

    /// The range to request from the store, if any
    pub fn byte_range(&self) -> Option<ByteRange> {
        match self {
            Self::Single(range) => Some(*range),
            Self::Absent | Self::Unsupported => None,
        }
    }
}

fn parse_single(value: &str) -> Option<ByteRange> {
    let bounds = value.strip_prefix("bytes=")?;
    let (start, end) = bounds.split_once('-')?;
    let start = parse_digits(start)?;
    if end.is_empty() {
        Some(ByteRange::from_offset(start))
    } else {
        ByteRange::inclusive(start, parse_digits(end)?)
    }
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
