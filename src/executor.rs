use crate::warehouse::{ResultSet, Warehouse, WarehouseError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Runs SQL against the warehouse. Execution failures are returned to the caller
/// untouched; only the advisory dry-run estimate is swallowed.
pub struct QueryExecutor {
    warehouse: Arc<dyn Warehouse>,
}

impl QueryExecutor {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    pub fn project(&self) -> &str {
        self.warehouse.project()
    }

    pub async fn execute(&self, sql: &str) -> Result<ResultSet, WarehouseError> {
        let start_time = Instant::now();
        info!("Executing query: {}", sql);

        match self.warehouse.query(sql).await {
            Ok(result) => {
                info!(
                    "Query returned {} rows in {}ms",
                    result.row_count(),
                    start_time.elapsed().as_millis()
                );
                Ok(result)
            }
            Err(e) => {
                error!("Error executing query: {}", e);
                Err(e)
            }
        }
    }

    /// Estimated bytes processed, or 0 when the estimate is unavailable.
    pub async fn dry_run_cost(&self, sql: &str) -> u64 {
        match self.warehouse.dry_run(sql).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Dry run failed, reporting zero cost: {}", e);
                0
            }
        }
    }

    /// First `limit` rows of a table, for suggestion heuristics and previews.
    pub async fn sample_rows(
        &self,
        dataset: &str,
        table: &str,
        limit: usize,
    ) -> Result<ResultSet, WarehouseError> {
        let sql = format!(
            "SELECT * FROM `{}.{}.{}` LIMIT {}",
            self.project(),
            dataset,
            table,
            limit
        );
        self.execute(&sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{orders_table, StubWarehouse};

    #[tokio::test]
    async fn execution_errors_are_propagated() {
        let executor = QueryExecutor::new(Arc::new(StubWarehouse::with_tables(vec![orders_table()])));
        let err = executor.execute("SELECT nope").await.unwrap_err();
        assert_eq!(err.to_string(), "cannot run: SELECT nope");
    }

    #[tokio::test]
    async fn dry_run_reports_the_estimate() {
        let executor = QueryExecutor::new(Arc::new(StubWarehouse::with_tables(vec![])));
        assert_eq!(executor.dry_run_cost("SELECT 1").await, 1024);
    }
}
