//! Natural-language-to-SQL synthesis: prompt the model (or the offline templates),
//! clean the answer into one statement, then run it.

pub mod cleanup;
pub mod fallback;
pub mod prompt;

use crate::catalog::Schema;
use crate::executor::QueryExecutor;
use crate::llm::ModelClient;
use crate::warehouse::ResultSet;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const NO_RESULTS: &str = "Query executed successfully but returned no results.";
const MARKDOWN_ROWS: usize = 50;

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub question: String,
    pub schema: Schema,
    pub project_id: String,
    pub dataset_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisStage {
    /// The model call failed, or offline mode had no template for the question.
    Synthesis,
    /// The model answered with something that is not a SQL statement.
    Validation,
    Execution,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SynthesisResult {
    pub sql: Option<String>,
    pub error: Option<String>,
    pub failed_stage: Option<SynthesisStage>,
    pub used_fallback: bool,
    pub estimated_bytes: Option<u64>,
    #[serde(skip)]
    pub results: Option<ResultSet>,
    /// Markdown table of the results, or a note when there are none.
    pub rendered: Option<String>,
}

impl SynthesisResult {
    fn failed(stage: SynthesisStage, sql: Option<String>, error: String) -> Self {
        Self {
            sql,
            error: Some(error),
            failed_stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.sql.is_some()
    }
}

/// Whether a model client could be constructed at startup.
pub enum ModelSlot {
    Ready(Arc<dyn ModelClient>),
    Unavailable(String),
}

pub struct Synthesizer {
    model: ModelSlot,
    executor: Arc<QueryExecutor>,
}

impl Synthesizer {
    pub fn new(model: ModelSlot, executor: Arc<QueryExecutor>) -> Self {
        if let ModelSlot::Unavailable(reason) = &model {
            warn!("Synthesizer running in offline mode: {}", reason);
        }
        Self { model, executor }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.model, ModelSlot::Unavailable(_))
    }

    pub async fn synthesize(&self, request: &SynthesisRequest) -> SynthesisResult {
        let question = request.question.trim();
        if question.is_empty() {
            return SynthesisResult::default();
        }

        let schema_lines = prompt::describe_schema(&request.schema);

        let (sql, used_fallback) = match &self.model {
            ModelSlot::Unavailable(reason) => {
                match fallback::generate_basic_sql(
                    question,
                    &schema_lines,
                    &request.project_id,
                    &request.dataset_id,
                ) {
                    Some(sql) => {
                        info!("Offline template matched: {}", sql);
                        (sql, true)
                    }
                    None => {
                        return SynthesisResult::failed(
                            SynthesisStage::Synthesis,
                            None,
                            offline_guidance(reason),
                        );
                    }
                }
            }
            ModelSlot::Ready(model) => {
                let prompt = prompt::build_prompt(
                    question,
                    &schema_lines,
                    &request.project_id,
                    &request.dataset_id,
                );
                debug!("Prepared LLM prompt: {}", prompt);

                let raw = match model.generate(&prompt).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        error!("Model call failed: {}", e);
                        return SynthesisResult::failed(
                            SynthesisStage::Synthesis,
                            None,
                            format!("Error generating SQL query: {}", e),
                        );
                    }
                };

                let cleaned = cleanup::clean_model_output(&raw);
                if !cleaned.valid {
                    return SynthesisResult::failed(
                        SynthesisStage::Validation,
                        Some(cleaned.sql),
                        format!(
                            "The generated text is not a recognized SQL statement (expected one of: {})",
                            cleanup::ALLOWED_KEYWORDS.join(", ")
                        ),
                    );
                }
                info!("Validated SQL: {}", cleaned.sql);
                (cleaned.sql, false)
            }
        };

        let mut result = self.run(sql).await;
        result.used_fallback = used_fallback;
        result
    }

    async fn run(&self, sql: String) -> SynthesisResult {
        let estimated_bytes = self.executor.dry_run_cost(&sql).await;

        match self.executor.execute(&sql).await {
            Ok(results) => {
                let rendered = if results.is_empty() {
                    NO_RESULTS.to_string()
                } else {
                    results.to_markdown(MARKDOWN_ROWS)
                };
                SynthesisResult {
                    sql: Some(sql),
                    estimated_bytes: Some(estimated_bytes),
                    results: Some(results),
                    rendered: Some(rendered),
                    ..Default::default()
                }
            }
            Err(e) => {
                let mut failed = SynthesisResult::failed(
                    SynthesisStage::Execution,
                    Some(sql),
                    format!("Error executing query: {}", e),
                );
                failed.estimated_bytes = Some(estimated_bytes);
                failed
            }
        }
    }
}

pub fn offline_guidance(reason: &str) -> String {
    let examples = fallback::SUPPORTED_PHRASES
        .iter()
        .map(|p| format!("'{}'", p))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "The language model is unavailable ({}). Offline mode understands questions like: {}.",
        reason, examples
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{orders_table, StubWarehouse};
    use crate::llm::LlmError;
    use crate::warehouse::{ColumnSchema, DataType, Value};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(LlmError::ConnectionError)
        }
    }

    fn executor(result: Option<ResultSet>) -> Arc<QueryExecutor> {
        let mut stub = StubWarehouse::with_tables(vec![orders_table()]);
        stub.result = result;
        Arc::new(QueryExecutor::new(Arc::new(stub)))
    }

    fn one_row() -> ResultSet {
        ResultSet::new(
            vec![ColumnSchema::new("n", DataType::BigInt)],
            vec![vec![Value::Int(1)]],
        )
    }

    fn request(question: &str, dataset: &str) -> SynthesisRequest {
        let mut schema = Schema::default();
        schema.insert("orders", orders_table().columns);
        SynthesisRequest {
            question: question.to_string(),
            schema,
            project_id: "project".to_string(),
            dataset_id: dataset.to_string(),
        }
    }

    #[tokio::test]
    async fn fenced_model_output_is_cleaned_and_executed() {
        let model = ScriptedModel::replying("```sql\nSELECT 1\n```");
        let synth = Synthesizer::new(ModelSlot::Ready(model.clone()), executor(Some(one_row())));

        let result = synth.synthesize(&request("how many orders?", "sales")).await;

        assert_eq!(result.sql.as_deref(), Some("SELECT 1"));
        assert!(result.is_success());
        assert_eq!(result.estimated_bytes, Some(1024));
        assert!(result.rendered.unwrap().contains("| n | "));

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Columns: order_id (BIGINT), region (VARCHAR), revenue (DOUBLE)"));
        assert!(prompts[0].contains("how many orders?"));
    }

    #[tokio::test]
    async fn bigquery_prefix_is_stripped() {
        let model = ScriptedModel::replying("bigquery SELECT * FROM t");
        let synth = Synthesizer::new(ModelSlot::Ready(model), executor(Some(one_row())));
        let result = synth.synthesize(&request("everything", "sales")).await;
        assert_eq!(result.sql.as_deref(), Some("SELECT * FROM t"));
    }

    #[tokio::test]
    async fn model_errors_stop_before_execution() {
        let model = Arc::new(ScriptedModel {
            reply: Err("timed out".to_string()),
            prompts: Mutex::new(Vec::new()),
        });
        let synth = Synthesizer::new(ModelSlot::Ready(model), executor(Some(one_row())));

        let result = synth.synthesize(&request("anything", "sales")).await;

        assert_eq!(result.sql, None);
        assert_eq!(
            result.error.as_deref(),
            Some("Error generating SQL query: LLM connection error: timed out")
        );
        assert_eq!(result.failed_stage, Some(SynthesisStage::Synthesis));
    }

    #[tokio::test]
    async fn prose_answers_are_never_executed() {
        let model = ScriptedModel::replying("Sorry, I don't know.");
        let synth = Synthesizer::new(ModelSlot::Ready(model), executor(Some(one_row())));

        let result = synth.synthesize(&request("anything", "sales")).await;

        assert_eq!(result.failed_stage, Some(SynthesisStage::Validation));
        assert!(result.results.is_none());
        assert_eq!(result.sql.as_deref(), Some("Sorry, I don't know."));
    }

    #[tokio::test]
    async fn execution_failure_keeps_the_sql() {
        let model = ScriptedModel::replying("SELECT broken");
        let synth = Synthesizer::new(ModelSlot::Ready(model), executor(None));

        let result = synth.synthesize(&request("anything", "sales")).await;

        assert_eq!(result.sql.as_deref(), Some("SELECT broken"));
        assert_eq!(result.failed_stage, Some(SynthesisStage::Execution));
        assert_eq!(
            result.error.as_deref(),
            Some("Error executing query: cannot run: SELECT broken")
        );
    }

    #[tokio::test]
    async fn offline_mode_uses_templates() {
        let synth = Synthesizer::new(
            ModelSlot::Unavailable("no backend".into()),
            executor(Some(ResultSet::default())),
        );

        let result = synth.synthesize(&request("first 10 rows", "sales.orders")).await;

        assert_eq!(
            result.sql.as_deref(),
            Some("SELECT * FROM `project.sales.orders` LIMIT 10")
        );
        assert!(result.used_fallback);
        assert_eq!(result.rendered.as_deref(), Some(NO_RESULTS));
    }

    #[tokio::test]
    async fn offline_mode_explains_supported_phrasings() {
        let synth = Synthesizer::new(ModelSlot::Unavailable("no backend".into()), executor(None));

        let result = synth.synthesize(&request("why did sales dip?", "sales")).await;

        let error = result.error.unwrap();
        assert!(error.starts_with("The language model is unavailable (no backend)."));
        assert!(error.contains("'how many rows are there'"));
        assert_eq!(result.sql, None);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_early() {
        let synth = Synthesizer::new(ModelSlot::Unavailable("x".into()), executor(None));
        let result = synth.synthesize(&request("   ", "sales")).await;
        assert!(result.sql.is_none() && result.error.is_none());
    }
}
