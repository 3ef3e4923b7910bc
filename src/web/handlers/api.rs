use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::DatasetProfile;
use crate::pipeline::{AskResponse, Stage};
use crate::warehouse::TableSchema;
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub dataset: String,
}

#[derive(Debug, Deserialize)]
pub struct DryRunRequest {
    pub sql: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionParams {
    pub dataset: Option<String>,
    pub table: Option<String>,
}

// Response types

#[derive(Debug, Serialize)]
pub struct DryRunResponse {
    pub estimated_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub project: String,
    pub dataset_count: usize,
    pub llm_backend: String,
    pub offline: bool,
}

// API Implementations

pub async fn list_datasets(state: State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.pipeline.datasets().await)
}

pub async fn list_tables(
    state: State<Arc<AppState>>,
    Path(dataset): Path<String>,
) -> Json<Vec<String>> {
    Json(state.pipeline.tables(&dataset).await)
}

/// Every table's columns (or fetch error) plus the tables' row counts.
pub async fn dataset_schema(
    state: State<Arc<AppState>>,
    Path(dataset): Path<String>,
) -> Json<DatasetProfile> {
    Json(state.pipeline.dataset_profile(&dataset).await)
}

pub async fn table_schema(
    state: State<Arc<AppState>>,
    Path((dataset, table)): Path<(String, String)>,
) -> Result<Json<TableSchema>, (StatusCode, String)> {
    state
        .pipeline
        .table_schema(&dataset, &table)
        .await
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("No schema available for {}.{}", dataset, table),
            )
        })
}

pub async fn suggestions(
    state: State<Arc<AppState>>,
    Query(params): Query<SuggestionParams>,
) -> Json<SuggestionsResponse> {
    let questions = state
        .pipeline
        .suggestions(params.dataset.as_deref(), params.table.as_deref())
        .await;
    Json(SuggestionsResponse { questions })
}

/// Failures after input validation are reported in the body, next to whatever SQL
/// was produced, so the caller can render both.
pub async fn ask(
    state: State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> (StatusCode, Json<AskResponse>) {
    let response = state.pipeline.ask(&payload.dataset, &payload.question).await;

    let status = match &response.error {
        Some(err) if err.stage == Stage::Input => StatusCode::BAD_REQUEST,
        Some(err) => {
            error!("Question failed at {:?}: {}", err.stage, err.message);
            StatusCode::OK
        }
        None => {
            info!("Answered question with SQL: {:?}", response.sql);
            StatusCode::OK
        }
    };

    (status, Json(response))
}

pub async fn dry_run(
    state: State<Arc<AppState>>,
    Json(payload): Json<DryRunRequest>,
) -> Result<Json<DryRunResponse>, (StatusCode, String)> {
    if payload.sql.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "SQL cannot be empty".to_string()));
    }

    let estimated_bytes = state.pipeline.dry_run(&payload.sql).await;
    Ok(Json(DryRunResponse { estimated_bytes }))
}

pub async fn system_status(state: State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        project: state.pipeline.project().to_string(),
        dataset_count: state.pipeline.datasets().await.len(),
        llm_backend: state.config.llm.backend.clone(),
        offline: state.pipeline.is_offline(),
    })
}

#[cfg(test)]
mod tests {
    use crate::catalog::tests::{orders_table, StubWarehouse};
    use crate::config::AppConfig;
    use crate::executor::QueryExecutor;
    use crate::pipeline::AnalyticsPipeline;
    use crate::synth::{ModelSlot, Synthesizer};
    use crate::warehouse::Warehouse;
    use crate::web::{app, state::AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> axum::Router {
        let warehouse: Arc<dyn Warehouse> =
            Arc::new(StubWarehouse::with_tables(vec![orders_table()]));
        let executor = Arc::new(QueryExecutor::new(warehouse.clone()));
        let synthesizer = Synthesizer::new(ModelSlot::Unavailable("offline".into()), executor.clone());
        let pipeline = AnalyticsPipeline::new(warehouse, executor, synthesizer);
        app(Arc::new(AppState::new(AppConfig::default(), pipeline)))
    }

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn lists_datasets_and_tables() {
        assert_eq!(call(get("/api/datasets")).await, (StatusCode::OK, json!(["sales"])));
        assert_eq!(
            call(get("/api/datasets/sales/tables")).await,
            (StatusCode::OK, json!(["orders"]))
        );
    }

    #[tokio::test]
    async fn dataset_schema_includes_row_counts() {
        let (status, body) = call(get("/api/datasets/sales/schema")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tables"]["orders"]["columns"][0]["name"], "order_id");
        assert_eq!(body["row_counts"], json!({"orders": 12}));
    }

    #[tokio::test]
    async fn table_schema_reports_columns_or_404() {
        let (status, body) = call(get("/api/datasets/sales/tables/orders/schema")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["columns"][2], json!({"name": "revenue", "type": "DOUBLE", "nullable": true}));

        let (status, _) = call(get("/api/datasets/sales/tables/missing/schema")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ask_reports_stage_failures_in_the_body() {
        let (status, body) = call(post(
            "/api/ask",
            json!({"question": "how many rows", "dataset": "sales.orders"}),
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["sql"],
            "SELECT COUNT(*) as total_records FROM `project.sales.orders`"
        );
        assert_eq!(body["error"]["stage"], "execution");
        assert_eq!(body["clear_input"], true);
    }

    #[tokio::test]
    async fn blank_question_is_a_bad_request() {
        let (status, body) = call(post("/api/ask", json!({"question": "", "dataset": "sales"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["stage"], "input");
    }

    #[tokio::test]
    async fn suggestions_default_without_context() {
        let (status, body) = call(get("/api/suggestions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"][0], "📊 Show me the main trends");
    }

    #[tokio::test]
    async fn dry_run_and_status() {
        let (_, body) = call(post("/api/dry-run", json!({"sql": "SELECT 1"}))).await;
        assert_eq!(body, json!({"estimated_bytes": 1024}));

        let (status, _) = call(post("/api/dry-run", json!({"sql": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(get("/api/status")).await;
        assert_eq!(body["project"], "project");
        assert_eq!(body["offline"], true);
        assert_eq!(body["dataset_count"], 1);
    }
}
