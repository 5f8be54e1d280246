use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;

use crate::{
    BlobConfig, BlobError, BlobResult, BlobStore, ByteStream, GetOptions, GetOutcome, PutResult,
};

/// Coordinates reads and writes against a [`BlobStore`].
///
/// The adapter owns the rules every backend shares: keys must be non-empty and
/// uploads may not exceed `BlobConfig::max_blob_bytes`.
#[derive(Clone)]
pub struct BlobAdapter {
    store: Arc<dyn BlobStore>,
    config: BlobConfig,
}

impl BlobAdapter {
    /// Create a new blob adapter
    pub fn new<S: BlobStore + 'static>(store: S, config: BlobConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    /// Create from a store that is already shared
    pub fn from_arc(store: Arc<dyn BlobStore>, config: BlobConfig) -> Self {
        Self { store, config }
    }

    /// Store a blob from a stream.
    ///
    /// `size_hint` is the declared length, when the caller knows it; the limit
    /// is enforced on the bytes actually streamed either way.
    pub async fn put(
        &self,
        key: &str,
        content_type: &str,
        size_hint: Option<u64>,
        body: ByteStream,
    ) -> BlobResult<PutResult> {
        validate_key(key)?;

        let max_bytes = self.config.max_blob_bytes;
        if size_hint.is_some_and(|size| size > max_bytes) {
            return Err(BlobError::TooLarge { max_bytes });
        }

        let exceeded = Arc::new(AtomicBool::new(false));
        let limited = limit_stream(body, max_bytes, exceeded.clone());

        match self.store.put(key, content_type, limited).await {
            Err(_) if exceeded.load(Ordering::SeqCst) => {
                tracing::warn!(key = %key, max_bytes, "Upload rejected: size limit exceeded");
                Err(BlobError::TooLarge { max_bytes })
            }
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Upload failed");
                Err(e)
            }
            Ok(result) => {
                tracing::debug!(
                    key = %key,
                    size_bytes = result.size_bytes,
                    content_type = %content_type,
                    "Stored object"
                );
                Ok(result)
            }
        }
    }

    /// Open a blob for reading
    pub async fn open(&self, key: &str, options: GetOptions) -> BlobResult<GetOutcome> {
        validate_key(key)?;
        self.store.get(key, options).await
    }

    /// Delete a blob
    pub async fn delete(&self, key: &str) -> BlobResult<()> {
        validate_key(key)?;
        self.store.delete(key).await
    }
}

fn validate_key(key: &str) -> BlobResult<()> {
    if key.is_empty() {
        return Err(BlobError::invalid("Object key must not be empty"));
    }
    Ok(())
}

/// Pass chunks through until more than `max_bytes` were seen, then fail the
/// stream and raise `exceeded`.
fn limit_stream(mut body: ByteStream, max_bytes: u64, exceeded: Arc<AtomicBool>) -> ByteStream {
    Box::pin(async_stream::stream! {
        let mut seen: u64 = 0;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    seen += bytes.len() as u64;
                    if seen > max_bytes {
                        exceeded.store(true, Ordering::SeqCst);
                        yield Err(std::io::Error::other(format!(
                            "object exceeds maximum size of {max_bytes} bytes"
                        )));
                        break;
                    }
                    yield Ok(bytes);
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    })
}
