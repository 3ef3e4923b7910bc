use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Catalog browsing
            .route("/datasets", get(handlers::api::list_datasets))
            .route("/datasets/{dataset}/tables", get(handlers::api::list_tables))
            .route("/datasets/{dataset}/schema", get(handlers::api::dataset_schema))
            .route(
                "/datasets/{dataset}/tables/{table}/schema",
                get(handlers::api::table_schema),
            )
            .route("/suggestions", get(handlers::api::suggestions))
            // Question answering
            .route("/ask", post(handlers::api::ask))
            .route("/dry-run", post(handlers::api::dry_run))
            // System status
            .route("/status", get(handlers::api::system_status)),
    )
}
