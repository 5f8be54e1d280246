use anyhow::Result;
use reel_gateway::{build_blob_adapter, logging, GatewayApp, GatewayConfig, GatewayState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = GatewayConfig::from_env()?;
    let addr = config.listen_addr();
    let blobs = build_blob_adapter(&config).await?;

    let app = GatewayApp::new(GatewayState::new(blobs, config))?;
    app.listen(addr).await?;

    Ok(())
}
