//! Dataset/table discovery. Every operation here fails soft: warehouse errors are
//! logged and turned into empty values so an interactive caller always has something
//! to render.

use crate::warehouse::{ColumnSchema, TableSchema, Warehouse};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Column metadata for a set of tables, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Schema {
    pub tables: BTreeMap<String, Vec<ColumnSchema>>,
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<ColumnSchema>) {
        self.tables.insert(table.into(), columns);
    }

    /// Every column name across all tables, in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.tables
            .values()
            .flat_map(|cols| cols.iter().map(|c| c.name.clone()))
            .collect()
    }
}

/// One entry of a full dataset schema: either the table's columns or the reason
/// they could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableEntry {
    Columns { columns: Vec<ColumnSchema> },
    Error { error: String },
}

impl TableEntry {
    pub fn is_error(&self) -> bool {
        matches!(self, TableEntry::Error { .. })
    }
}

pub type DatasetSchema = BTreeMap<String, TableEntry>;

/// A dataset's full schema together with the row count of each table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub tables: DatasetSchema,
    pub row_counts: BTreeMap<String, u64>,
}

/// Splits a `dataset.table` selection at its first dot. A plain dataset name has no
/// table part.
pub fn split_dataset_id(id: &str) -> (&str, Option<&str>) {
    match id.split_once('.') {
        Some((dataset, table)) => (dataset, Some(table).filter(|t| !t.is_empty())),
        None => (id, None),
    }
}

/// Drops the failed entries of a dataset schema, leaving the tables a prompt can use.
pub fn usable_schema(dataset: &DatasetSchema) -> Schema {
    let mut schema = Schema::default();
    for (table, entry) in dataset {
        match entry {
            TableEntry::Columns { columns } => schema.insert(table.clone(), columns.clone()),
            TableEntry::Error { error } => {
                warn!("Leaving table {} out of the schema: {}", table, error)
            }
        }
    }
    schema
}

pub struct SchemaCatalog {
    warehouse: Arc<dyn Warehouse>,
}

impl SchemaCatalog {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    pub fn project(&self) -> &str {
        self.warehouse.project()
    }

    pub async fn list_datasets(&self) -> Vec<String> {
        match self.warehouse.list_datasets().await {
            Ok(datasets) => datasets,
            Err(e) => {
                error!("Error retrieving datasets for project {}: {}", self.project(), e);
                Vec::new()
            }
        }
    }

    pub async fn list_tables(&self, dataset: &str) -> Vec<String> {
        if dataset.trim().is_empty() {
            warn!("Dataset name cannot be empty");
            return Vec::new();
        }
        match self.warehouse.list_tables(dataset).await {
            Ok(tables) => tables,
            Err(e) => {
                error!("Error retrieving tables for dataset {}: {}", dataset, e);
                Vec::new()
            }
        }
    }

    pub async fn get_table_schema(&self, dataset: &str, table: &str) -> Option<TableSchema> {
        if dataset.trim().is_empty() || table.trim().is_empty() {
            warn!("Dataset and table names cannot be empty");
            return None;
        }
        match self.warehouse.get_table(dataset, table).await {
            Ok(schema) => Some(schema),
            Err(e) => {
                error!("Error retrieving schema for table {}.{}: {}", dataset, table, e);
                None
            }
        }
    }

    /// Fetches every table's schema. A table whose fetch fails keeps its key with an
    /// error entry instead of being dropped.
    pub async fn get_full_dataset_schema(&self, dataset: &str) -> DatasetSchema {
        let mut full_schema = DatasetSchema::new();

        let tables = self.list_tables(dataset).await;
        if tables.is_empty() {
            warn!("No tables found or error retrieving tables for dataset {}", dataset);
            return full_schema;
        }

        for table in tables {
            let entry = match self.get_table_schema(dataset, &table).await {
                Some(schema) => TableEntry::Columns {
                    columns: schema.columns,
                },
                None => TableEntry::Error {
                    error: format!("Could not retrieve schema for table {}", table),
                },
            };
            full_schema.insert(table, entry);
        }

        info!(
            "Fetched schema for {} tables in dataset {}",
            full_schema.len(),
            dataset
        );
        full_schema
    }

    /// Row count per table. A table whose count fails is logged and left out.
    pub async fn table_row_counts(&self, dataset: &str) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for table in self.list_tables(dataset).await {
            match self.warehouse.row_count(dataset, &table).await {
                Ok(count) => {
                    counts.insert(table, count);
                }
                Err(e) => error!("Error counting rows in {}.{}: {}", dataset, table, e),
            }
        }
        counts
    }

    pub async fn get_dataset_profile(&self, dataset: &str) -> DatasetProfile {
        DatasetProfile {
            tables: self.get_full_dataset_schema(dataset).await,
            row_counts: self.table_row_counts(dataset).await,
        }
    }
}
