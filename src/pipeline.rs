//! One submission end to end: schema lookup, synthesis, execution and shaping.

use crate::catalog::{self, DatasetProfile, DatasetSchema, SchemaCatalog};
use crate::executor::QueryExecutor;
use crate::shaping::{ChartSpec, Insight, ResultShaper, TableView};
use crate::suggest;
use crate::synth::{SynthesisRequest, SynthesisStage, Synthesizer};
use crate::warehouse::{TableSchema, Warehouse};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Synthesis,
    Validation,
    Execution,
}

impl From<SynthesisStage> for Stage {
    fn from(stage: SynthesisStage) -> Self {
        match stage {
            SynthesisStage::Synthesis => Stage::Synthesis,
            SynthesisStage::Validation => Stage::Validation,
            SynthesisStage::Execution => Stage::Execution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// Everything the presentation layer needs to render one submission.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub dataset: String,
    pub sql: Option<String>,
    pub estimated_bytes: Option<u64>,
    pub markdown: Option<String>,
    pub table: Option<TableView>,
    pub chart: Option<ChartSpec>,
    pub insights: Vec<Insight>,
    pub error: Option<StageError>,
    pub clear_input: bool,
}

impl AskResponse {
    fn new(question: &str, dataset: &str) -> Self {
        Self {
            question: question.to_string(),
            dataset: dataset.to_string(),
            sql: None,
            estimated_bytes: None,
            markdown: None,
            table: None,
            chart: None,
            insights: Vec::new(),
            error: None,
            clear_input: false,
        }
    }

    fn failed(mut self, stage: Stage, message: impl Into<String>) -> Self {
        self.error = Some(StageError {
            stage,
            message: message.into(),
        });
        self
    }
}

pub struct AnalyticsPipeline {
    catalog: SchemaCatalog,
    executor: Arc<QueryExecutor>,
    synthesizer: Synthesizer,
    shaper: ResultShaper,
}

impl AnalyticsPipeline {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        executor: Arc<QueryExecutor>,
        synthesizer: Synthesizer,
    ) -> Self {
        Self {
            catalog: SchemaCatalog::new(warehouse),
            executor,
            synthesizer,
            shaper: ResultShaper::default(),
        }
    }

    pub fn project(&self) -> &str {
        self.catalog.project()
    }

    pub fn is_offline(&self) -> bool {
        self.synthesizer.is_offline()
    }

    pub async fn datasets(&self) -> Vec<String> {
        self.catalog.list_datasets().await
    }

    pub async fn tables(&self, dataset: &str) -> Vec<String> {
        self.catalog.list_tables(dataset).await
    }

    pub async fn table_schema(&self, dataset: &str, table: &str) -> Option<TableSchema> {
        self.catalog.get_table_schema(dataset, table).await
    }

    pub async fn dataset_schema(&self, dataset: &str) -> DatasetSchema {
        self.catalog.get_full_dataset_schema(dataset).await
    }

    pub async fn dataset_profile(&self, dataset: &str) -> DatasetProfile {
        self.catalog.get_dataset_profile(dataset).await
    }

    pub async fn dry_run(&self, sql: &str) -> u64 {
        self.executor.dry_run_cost(sql).await
    }

    /// Four example questions, sharpened by the table's columns and a few sample rows
    /// when a table is selected.
    pub async fn suggestions(&self, dataset: Option<&str>, table: Option<&str>) -> Vec<String> {
        let (Some(dataset_name), Some(table)) = (dataset, table) else {
            return suggest::suggest(dataset, None, None);
        };

        let columns = self
            .catalog
            .get_table_schema(dataset_name, table)
            .await
            .map(|schema| schema.column_names());

        let sample = match self.executor.sample_rows(dataset_name, table, SAMPLE_ROWS).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!("No sample rows for {}.{}: {}", dataset_name, table, e);
                None
            }
        };

        suggest::suggest(Some(dataset_name), columns.as_deref(), sample.as_ref())
    }

    pub async fn ask(&self, dataset: &str, question: &str) -> AskResponse {
        info!("Question for {}.{}: {}", self.project(), dataset, question);
        let response = AskResponse::new(question, dataset);

        if question.trim().is_empty() {
            return response.failed(Stage::Input, "Please enter a question.");
        }
        if dataset.trim().is_empty() {
            return response.failed(Stage::Input, "Please select a dataset first.");
        }

        // A `dataset.table` selection scopes the schema to its dataset
        let (schema_dataset, _) = catalog::split_dataset_id(dataset);
        let full = self.catalog.get_full_dataset_schema(schema_dataset).await;
        let schema = catalog::usable_schema(&full);
        if schema.is_empty() {
            warn!("No usable tables found in dataset {}", schema_dataset);
        }

        let request = SynthesisRequest {
            question: question.trim().to_string(),
            schema,
            project_id: self.project().to_string(),
            dataset_id: dataset.to_string(),
        };
        let synthesis = self.synthesizer.synthesize(&request).await;

        let mut response = AskResponse {
            sql: synthesis.sql.clone(),
            estimated_bytes: synthesis.estimated_bytes,
            markdown: synthesis.rendered.clone(),
            clear_input: synthesis.sql.is_some(),
            ..response
        };

        if let Some(message) = synthesis.error {
            let stage = synthesis
                .failed_stage
                .map(Stage::from)
                .unwrap_or(Stage::Synthesis);
            return response.failed(stage, message);
        }

        if let Some(results) = &synthesis.results {
            let shaped = self.shaper.shape(results, question);
            info!(
                "Shaped {} rows into a {} chart",
                results.row_count(),
                shaped.chart.kind()
            );
            response.chart = Some(shaped.chart);
            response.insights = shaped.insights;
            response.table = Some(shaped.table);
        }

        response
    }
}
