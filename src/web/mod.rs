// Thin JSON adapter over the analytics pipeline. The browser side lives elsewhere and
// drives everything through these endpoints; "clear" never reaches the server.

pub mod handlers;
pub mod routes;
pub mod state;

use crate::config::WebConfig;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn app(state: Arc<AppState>) -> Router {
    routes::api_routes()
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: &WebConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Could not listen for the shutdown signal: {}", e),
    }
}
