use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::{
    BlobError, BlobResult, BlobStore, ByteStream, ConditionCheck, GetOptions, GetOutcome,
    GetResult, ObjectHead, PutResult,
};

/// Chunk size used when streaming stored content back out
const READ_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug)]
struct StoredObject {
    content: Bytes,
    content_type: String,
    etag: String,
    uploaded_at: DateTime<Utc>,
}

impl StoredObject {
    fn head(&self) -> ObjectHead {
        ObjectHead {
            size_bytes: self.content.len() as u64,
            content_type: Some(self.content_type.clone()),
            etag: Some(self.etag.clone()),
            last_modified: Some(self.uploaded_at),
        }
    }
}

/// In-process store for local development and tests.
///
/// A put collects the whole stream before swapping the entry in, so readers
/// never observe a partially written object.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, Arc<StoredObject>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    fn content_etag(content: &[u8]) -> String {
        hex::encode(Sha256::digest(content))
    }

    fn chunked(content: Bytes) -> ByteStream {
        let chunks: Vec<Result<Bytes, std::io::Error>> = if content.is_empty() {
            Vec::new()
        } else {
            content
                .chunks(READ_CHUNK_BYTES)
                .map(|chunk| Ok(content.slice_ref(chunk)))
                .collect()
        };
        Box::pin(futures::stream::iter(chunks))
    }

    async fn lookup(&self, key: &str) -> BlobResult<Arc<StoredObject>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::not_found(key))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        let content = buffer.freeze();
        let etag = Self::content_etag(&content);
        let size_bytes = content.len() as u64;

        let object = Arc::new(StoredObject {
            content,
            content_type: content_type.to_string(),
            etag: etag.clone(),
            uploaded_at: Utc::now(),
        });
        self.objects.write().await.insert(key.to_string(), object);

        Ok(PutResult {
            etag: Some(etag),
            size_bytes,
        })
    }

    async fn get(&self, key: &str, options: GetOptions) -> BlobResult<GetOutcome> {
        let object = self.lookup(key).await?;

        match options.conditions.evaluate(&object.etag) {
            ConditionCheck::Proceed => {}
            ConditionCheck::NotModified => {
                return Ok(GetOutcome::NotModified {
                    etag: Some(object.etag.clone()),
                })
            }
            ConditionCheck::PreconditionFailed => {
                return Ok(GetOutcome::PreconditionFailed {
                    etag: Some(object.etag.clone()),
                })
            }
        }

        let size = object.content.len() as u64;
        let resolved_range = options.range.and_then(|range| range.resolve(size));
        let content = match &resolved_range {
            Some(range) => object
                .content
                .slice(range.start as usize..=range.end as usize),
            None => object.content.clone(),
        };

        Ok(GetOutcome::Found(GetResult {
            stream: Self::chunked(content),
            head: object.head(),
            resolved_range,
        }))
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
