//! reel-gateway: HTTP front for reel uploads and playback.
//!
//! `POST /` hands out an upload URL, `PUT /upload/<key>` streams bytes into
//! the store, `GET /<key>` streams them back (with single byte ranges for
//! seeking) and `DELETE /<key>` removes them. Every response carries CORS
//! headers.

pub mod app;
pub mod config;
pub mod cors;
pub mod handlers;
pub mod logging;
pub mod range;
pub mod routes;
pub mod state;
mod error;

pub use app::{build_blob_adapter, GatewayApp};
pub use config::{GatewayConfig, StorageBackend};
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use range::RangeRequest;
pub use routes::Route;
pub use state::GatewayState;
