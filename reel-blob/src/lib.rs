//! # reel-blob: streaming blob storage for the reels gateway
//!
//! `reel-blob` holds the storage half of the gateway. It knows nothing about
//! HTTP: callers hand it keys, byte streams, byte ranges and entity-tag
//! preconditions, and get streams back.
//!
//! ## Key Features
//!
//! - **Streaming-first**: uploads and downloads never buffer a whole video
//! - **Range reads**: single byte ranges, clamped to the object, for scrubbing
//! - **Conditional reads**: `If-Match` / `If-None-Match` evaluated by the store
//! - **Storage agnostic**: S3-compatible buckets (Cloudflare R2) or in-memory
//!
//! ## Quick Start
//!
//! ```rust
//! use reel_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let adapter = BlobAdapter::new(MemoryBlobStore::new(), BlobConfig::default());
//!
//! let body = futures::stream::once(async { Ok(bytes::Bytes::from_static(b"hello")) });
//! adapter.put("clips/a.mp4", "video/mp4", Some(5), Box::pin(body)).await?;
//!
//! let range = ByteRange::inclusive(0, 1).expect("valid range");
//! match adapter.open("clips/a.mp4", GetOptions::new().with_range(range)).await? {
//!     GetOutcome::Found(result) => assert_eq!(result.content_length(), 2),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP gateway  │  ← routing, headers, CORS
//! ├─────────────────┤
//! │   BlobAdapter   │  ← key and size rules
//! ├─────────────────┤
//! │   BlobStore     │  ← storage primitives
//! └─────────────────┘
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod memory;
pub mod s3_store;
pub mod store;
pub mod types;

pub use adapter::BlobAdapter;
pub use config::{BlobConfig, UploadRules, MIN_PART_SIZE};
pub use error::{BlobError, BlobResult};
pub use memory::MemoryBlobStore;
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{BlobStore, GetOutcome, GetResult, ObjectHead, PutResult};
pub use types::{ByteRange, ByteStream, ConditionCheck, Conditions, GetOptions, ResolvedRange};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobAdapter, BlobConfig, BlobError, BlobResult, BlobStore, ByteRange, ByteStream,
        Conditions, GetOptions, GetOutcome, GetResult, MemoryBlobStore, ObjectHead, PutResult,
        ResolvedRange, UploadRules,
    };
}
