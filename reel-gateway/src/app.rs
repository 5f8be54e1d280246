use axum::http::{header, HeaderValue};
use axum::Router;
use reel_blob::{BlobAdapter, MemoryBlobStore, S3CompatibleStore};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, StorageBackend};
use crate::{cors, routes, GatewayState};

#[derive(Clone)]
pub struct GatewayApp {
    pub state: GatewayState,
    pub router: Router<()>,
}

impl GatewayApp {
    pub fn new(state: GatewayState) -> anyhow::Result<Self> {
        let cors_layer = cors::cors_layer(&state.config.allowed_origin)?;

        let router = Router::new()
            .fallback(routes::dispatch)
            .with_state(state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::ACCESS_CONTROL_EXPOSE_HEADERS,
                        HeaderValue::from_static(cors::EXPOSED_HEADERS),
                    ))
                    .layer(cors_layer)
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::ACCESS_CONTROL_ALLOW_METHODS,
                        HeaderValue::from_static(cors::ALLOWED_METHODS),
                    ))
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::ACCESS_CONTROL_ALLOW_HEADERS,
                        HeaderValue::from_static(cors::ALLOWED_HEADERS),
                    )),
            );

        Ok(Self { state, router })
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "reel gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("reel gateway stopped");
        Ok(())
    }
}

/// Build the blob adapter for the configured backend
pub async fn build_blob_adapter(config: &GatewayConfig) -> anyhow::Result<BlobAdapter> {
    let adapter = match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; objects are lost on restart");
            BlobAdapter::new(MemoryBlobStore::new(), config.blob_config())
        }
        StorageBackend::S3 => {
            let s3 = config.s3_config()?;
            tracing::info!(
                bucket = %s3.bucket,
                endpoint = ?s3.endpoint_url,
                region = %s3.region,
                "Using S3-compatible storage"
            );
            let store = S3CompatibleStore::new(s3, config.upload_rules()).await;
            BlobAdapter::new(store, config.blob_config())
        }
    };
    Ok(adapter)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
