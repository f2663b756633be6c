//! HTTP surface
//!
//! Serves the upload endpoint and health checks on HOST:PORT (default
//! 0.0.0.0:5000).

pub mod client_ip;
pub mod health;
pub mod upload;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::core::config::Settings;
use crate::telegram::{ClientCell, Connector};

/// Slack on top of `MAX_FILE_SIZE` for multipart boundaries and headers.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Shared state for the upload server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub clients: Arc<ClientCell>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, connector: Arc<dyn Connector>) -> Self {
        let clients = Arc::new(ClientCell::new(Arc::clone(&settings), connector));
        Self { settings, clients }
    }
}

/// Builds the router. The body limit rejects oversized uploads while they
/// stream instead of after buffering.
pub fn router(state: AppState) -> Router {
    let body_limit = state.settings.max_file_size.saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(health::status_handler))
        .route("/health", get(health::liveness_handler))
        .route("/upload", post(upload::upload_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Start the upload server and run until Ctrl+C / SIGTERM.
pub async fn start_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;

    log::info!("Starting upload server on http://{}", listener.local_addr()?);
    log::info!("  /        - Health and configuration status (JSON)");
    log::info!("  /health  - Liveness check");
    log::info!("  /upload  - Multipart upload, field 'file'");

    axum::serve(listener, router(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Upload server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}
