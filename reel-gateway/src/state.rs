use std::sync::Arc;

use reel_blob::BlobAdapter;

use crate::GatewayConfig;

#[derive(Clone)]
pub struct GatewayState {
    pub blobs: Arc<BlobAdapter>,
    pub config: Arc<GatewayConfig>,
}

impl GatewayState {
    pub fn new(blobs: BlobAdapter, config: GatewayConfig) -> Self {
        Self {
            blobs: Arc::new(blobs),
            config: Arc::new(config),
        }
    }
}
