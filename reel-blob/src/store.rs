use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{BlobResult, ByteStream, GetOptions, ResolvedRange};

/// Core blob storage operations - must be implemented by all storage backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob from a stream, replacing any object under `key`.
    ///
    /// The object must not become visible until the whole stream was consumed.
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        stream: ByteStream,
    ) -> BlobResult<PutResult>;

    /// Read a blob, honoring an optional range and entity-tag preconditions
    async fn get(&self, key: &str, options: GetOptions) -> BlobResult<GetOutcome>;

    /// Delete a blob. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> BlobResult<()>;
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
}

/// Metadata about a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub content_type: Option<String>,
    /// Entity tag without surrounding quotes
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Object content returned by a read
pub struct GetResult {
    pub stream: ByteStream,
    pub head: ObjectHead,
    /// Set only when the store served a partial range
    pub resolved_range: Option<ResolvedRange>,
}

impl GetResult {
    /// Number of bytes the stream yields
    pub fn content_length(&self) -> u64 {
        self.resolved_range
            .as_ref()
            .map_or(self.head.size_bytes, ResolvedRange::content_length)
    }

    pub fn is_partial(&self) -> bool {
        self.resolved_range.is_some()
    }
}

/// What a read produced once the store evaluated the preconditions
pub enum GetOutcome {
    Found(GetResult),
    /// `If-None-Match` matched the current etag
    NotModified { etag: Option<String> },
    /// `If-Match` did not match the current etag
    PreconditionFailed { etag: Option<String> },
}

impl std::fmt::Debug for GetOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GetOutcome::Found(result) => f
                .debug_struct("Found")
                .field("head", &result.head)
                .field("resolved_range", &result.resolved_range)
                .finish_non_exhaustive(),
            GetOutcome::NotModified { etag } => {
                f.debug_struct("NotModified").field("etag", etag).finish()
            }
            GetOutcome::PreconditionFailed { etag } => f
                .debug_struct("PreconditionFailed")
                .field("etag", etag)
                .finish(),
        }
    }
}
