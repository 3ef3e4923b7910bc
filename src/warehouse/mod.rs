pub mod dialect;
pub mod duck;
pub mod pool;
pub mod result;
pub mod schema;

pub use result::{ResultSet, Value};
pub use schema::{ColumnSchema, DataType, TableSchema};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse connection error: {0}")]
    Connection(String),
    #[error("{0}")]
    Query(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("warehouse task failed: {0}")]
    Task(String),
}

impl From<duckdb::Error> for WarehouseError {
    fn from(err: duckdb::Error) -> Self {
        WarehouseError::Query(err.to_string())
    }
}

impl From<r2d2::Error> for WarehouseError {
    fn from(err: r2d2::Error) -> Self {
        WarehouseError::Connection(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for WarehouseError {
    fn from(err: arrow::error::ArrowError) -> Self {
        WarehouseError::Query(format!("failed to decode result: {}", err))
    }
}

impl From<tokio::task::JoinError> for WarehouseError {
    fn from(err: tokio::task::JoinError) -> Self {
        WarehouseError::Task(err.to_string())
    }
}

/// The warehouse operations the pipeline relies on. Every call is attempted once;
/// callers decide whether a failure is swallowed or surfaced.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Identifier of the project every dataset lives in.
    fn project(&self) -> &str;

    async fn list_datasets(&self) -> Result<Vec<String>, WarehouseError>;

    async fn list_tables(&self, dataset: &str) -> Result<Vec<String>, WarehouseError>;

    async fn get_table(&self, dataset: &str, table: &str) -> Result<TableSchema, WarehouseError>;

    async fn query(&self, sql: &str) -> Result<ResultSet, WarehouseError>;

    /// Estimated bytes the statement would process, without running it.
    async fn dry_run(&self, sql: &str) -> Result<u64, WarehouseError>;

    async fn row_count(&self, dataset: &str, table: &str) -> Result<u64, WarehouseError>;
}
