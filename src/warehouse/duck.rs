use crate::warehouse::dialect;
use crate::warehouse::pool::{quote_ident, quote_literal, DuckDBConnectionManager};
use crate::warehouse::{
    ColumnSchema, DataType, ResultSet, TableSchema, Value, Warehouse, WarehouseError,
};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType as ArrowType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use async_trait::async_trait;
use r2d2::Pool;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Schema DuckDB resolves unqualified table names against.
const DEFAULT_SCHEMA: &str = "main";

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^']|'')*'").expect("valid literal pattern"));

static OBJECT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:"(?:[^"]|"")+"|[A-Za-z_][A-Za-z0-9_$]*)(?:\s*\.\s*(?:"(?:[^"]|"")+"|[A-Za-z_][A-Za-z0-9_$]*))*"#,
    )
    .expect("valid object path pattern")
});

static PATH_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""((?:[^"]|"")+)"|([A-Za-z_][A-Za-z0-9_$]*)"#).expect("valid path part pattern")
});

/// DuckDB-backed warehouse: the project is an attached catalog and every dataset
/// is a schema inside it.
pub struct DuckDbWarehouse {
    pool: Pool<DuckDBConnectionManager>,
    project: String,
}

impl DuckDbWarehouse {
    pub fn open(path: &str, project: &str, pool_size: u32) -> Result<Self, WarehouseError> {
        info!("Attaching warehouse {} as project '{}'", path, project);
        let manager = DuckDBConnectionManager::attach(path, project)
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        Ok(Self {
            pool,
            project: project.to_string(),
        })
    }

    /// Runs a batch of statements (DDL, seed data) inside the project catalog.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), WarehouseError> {
        let sql = dialect::to_duckdb(sql);
        self.with_connection(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
    }

    /// Runs `f` on a pooled connection inside a blocking task.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, WarehouseError>
    where
        T: Send + 'static,
        F: FnOnce(&duckdb::Connection) -> Result<T, WarehouseError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    fn project(&self) -> &str {
        &self.project
    }

    async fn list_datasets(&self) -> Result<Vec<String>, WarehouseError> {
        let project = self.project.clone();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT schema_name FROM information_schema.schemata \
                 WHERE catalog_name = ? AND schema_name NOT IN ('information_schema', 'pg_catalog') \
                 ORDER BY schema_name",
            )?;
            let datasets = stmt
                .query_map([&project], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(datasets)
        })
        .await
    }

    async fn list_tables(&self, dataset: &str) -> Result<Vec<String>, WarehouseError> {
        let project = self.project.clone();
        let dataset = dataset.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_catalog = ? AND table_schema = ? ORDER BY table_name",
            )?;
            let tables = stmt
                .query_map([&project, &dataset], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tables)
        })
        .await
    }

    async fn get_table(&self, dataset: &str, table: &str) -> Result<TableSchema, WarehouseError> {
        let project = self.project.clone();
        let dataset = dataset.to_string();
        let table = table.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT column_name, data_type, is_nullable FROM information_schema.columns \
                 WHERE table_catalog = ? AND table_schema = ? AND table_name = ? \
                 ORDER BY ordinal_position",
            )?;
            let columns = stmt
                .query_map([&project, &dataset, &table], |row| {
                    Ok(ColumnSchema {
                        name: row.get::<_, String>(0)?,
                        data_type: DataType::from_sql_type(&row.get::<_, String>(1)?),
                        nullable: row.get::<_, String>(2)? == "YES",
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            if columns.is_empty() {
                return Err(WarehouseError::NotFound(format!(
                    "table {}.{}.{}",
                    project, dataset, table
                )));
            }

            Ok(TableSchema {
                name: table,
                columns,
            })
        })
        .await
    }

    async fn query(&self, sql: &str) -> Result<ResultSet, WarehouseError> {
        let sql = dialect::to_duckdb(sql);
        debug!("Executing on DuckDB: {}", sql);

        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let results = stmt.query_arrow([])?;
            let schema = results.get_schema();
            let batches: Vec<RecordBatch> = results.collect();

            let columns = schema
                .fields()
                .iter()
                .map(|field| ColumnSchema {
                    name: field.name().clone(),
                    data_type: data_type_of(field.data_type()),
                    nullable: field.is_nullable(),
                })
                .collect::<Vec<_>>();

            let mut rows = Vec::new();
            for batch in &batches {
                rows.extend(batch_rows(batch)?);
            }

            Ok(ResultSet::new(columns, rows))
        })
        .await
    }

    async fn dry_run(&self, sql: &str) -> Result<u64, WarehouseError> {
        let sql = dialect::to_duckdb(sql);
        let project = self.project.clone();

        self.with_connection(move |conn| {
            // Preparing binds every referenced object without running the statement
            conn.prepare(&sql)?;

            let mut stmt = conn.prepare(&format!(
                "SELECT schema_name, table_name, estimated_size, column_count FROM duckdb_tables() \
                 WHERE database_name = {}",
                quote_literal(&project)
            ))?;
            let tables = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let referenced = referenced_tables(&sql, &project);
            let bytes: u64 = tables
                .iter()
                .filter(|(schema, name, _, _)| {
                    referenced.contains(&(schema.to_lowercase(), name.to_lowercase()))
                })
                .map(|(_, _, rows, cols)| (rows.max(&0) * cols.max(&0) * 8) as u64)
                .sum();

            Ok(bytes)
        })
        .await
    }

    async fn row_count(&self, dataset: &str, table: &str) -> Result<u64, WarehouseError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.{}.{}",
            quote_ident(&self.project),
            quote_ident(dataset),
            quote_ident(table)
        );
        self.with_connection(move |conn| {
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

/// Lower-cased `(schema, table)` pairs a statement may read. Unqualified names resolve
/// to `main`, and three-part names count only inside `project`.
fn referenced_tables(sql: &str, project: &str) -> HashSet<(String, String)> {
    let sql = STRING_LITERAL.replace_all(sql, "''");
    let project = project.to_lowercase();

    let mut referenced = HashSet::new();
    for path in OBJECT_PATH.find_iter(&sql) {
        let parts: Vec<String> = PATH_PART
            .captures_iter(path.as_str())
            .filter_map(|caps| match (caps.get(1), caps.get(2)) {
                (Some(quoted), _) => Some(quoted.as_str().replace("\"\"", "\"")),
                (None, Some(bare)) => Some(bare.as_str().to_string()),
                (None, None) => None,
            })
            .map(|part| part.to_lowercase())
            .collect();

        match parts.as_slice() {
            [table] => {
                referenced.insert((DEFAULT_SCHEMA.to_string(), table.clone()));
            }
            [schema, table] => {
                referenced.insert((schema.clone(), table.clone()));
            }
            [catalog, schema, table] if *catalog == project => {
                referenced.insert((schema.clone(), table.clone()));
            }
            _ => {}
        }
    }
    referenced
}

fn data_type_of(arrow_type: &ArrowType) -> DataType {
    match arrow_type {
        ArrowType::Int8 | ArrowType::Int16 | ArrowType::Int32 => DataType::Integer,
        ArrowType::UInt8 | ArrowType::UInt16 | ArrowType::UInt32 => DataType::Integer,
        ArrowType::Int64 | ArrowType::UInt64 => DataType::BigInt,
        ArrowType::Float16 | ArrowType::Float32 | ArrowType::Float64 => DataType::Double,
        ArrowType::Decimal128(_, _) | ArrowType::Decimal256(_, _) => DataType::Decimal,
        ArrowType::Utf8 | ArrowType::LargeUtf8 | ArrowType::Utf8View => DataType::String,
        ArrowType::Boolean => DataType::Boolean,
        ArrowType::Date32 | ArrowType::Date64 => DataType::Date,
        ArrowType::Timestamp(_, _) => DataType::Timestamp,
        other => DataType::Unknown(other.to_string()),
    }
}

/// Converts one Arrow batch into row-major `Value`s.
fn batch_rows(batch: &RecordBatch) -> Result<Vec<Vec<Value>>, WarehouseError> {
    let columns = batch
        .columns()
        .iter()
        .map(column_values)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((0..batch.num_rows())
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect())
}

fn column_values(array: &ArrayRef) -> Result<Vec<Value>, WarehouseError> {
    let len = array.len();
    let kind = data_type_of(array.data_type());

    let values = match kind {
        DataType::Integer | DataType::BigInt => {
            let ints = cast(array.as_ref(), &ArrowType::Int64)?;
            let ints = ints.as_primitive::<Int64Type>();
            (0..len)
                .map(|i| {
                    if ints.is_null(i) {
                        Value::Null
                    } else {
                        Value::Int(ints.value(i))
                    }
                })
                .collect()
        }
        DataType::Double | DataType::Decimal => {
            let floats = cast(array.as_ref(), &ArrowType::Float64)?;
            let floats = floats.as_primitive::<Float64Type>();
            (0..len)
                .map(|i| {
                    if floats.is_null(i) {
                        Value::Null
                    } else {
                        Value::Float(floats.value(i))
                    }
                })
                .collect()
        }
        DataType::Boolean => {
            let bools = array.as_boolean();
            (0..len)
                .map(|i| {
                    if bools.is_null(i) {
                        Value::Null
                    } else {
                        Value::Bool(bools.value(i))
                    }
                })
                .collect()
        }
        other => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
            (0..len)
                .map(|i| {
                    if array.is_null(i) {
                        Value::Null
                    } else if other.is_temporal() {
                        Value::Timestamp(formatter.value(i).to_string())
                    } else {
                        Value::Text(formatter.value(i).to_string())
                    }
                })
                .collect()
        }
    };

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pair(schema: &str, table: &str) -> (String, String) {
        (schema.to_string(), table.to_string())
    }

    #[rstest]
    #[case::quoted_three_part(r#"SELECT * FROM "project"."sales"."orders""#, ("sales", "orders"))]
    #[case::schema_qualified("select region from Sales.Orders", ("sales", "orders"))]
    #[case::unqualified("SELECT * FROM orders", ("main", "orders"))]
    #[case::spaced_dots("SELECT * FROM sales . orders", ("sales", "orders"))]
    #[case::quoted_with_dot(r#"SELECT * FROM sales."odd.name""#, ("sales", "odd.name"))]
    fn finds_qualified_references(#[case] sql: &str, #[case] expected: (&str, &str)) {
        let referenced = referenced_tables(sql, "project");
        assert!(
            referenced.contains(&pair(expected.0, expected.1)),
            "{:?} not in {:?}",
            expected,
            referenced
        );
    }

    #[test]
    fn schema_qualified_reference_does_not_match_other_schemas() {
        let referenced = referenced_tables("SELECT * FROM sales.orders", "project");
        assert!(!referenced.contains(&pair("archive", "orders")));
        assert!(!referenced.contains(&pair("main", "orders")));
    }

    #[test]
    fn other_catalogs_and_string_literals_are_ignored() {
        let referenced = referenced_tables(
            "SELECT * FROM elsewhere.sales.orders WHERE note = 'archive.orders'",
            "project",
        );
        assert!(!referenced.contains(&pair("sales", "orders")));
        assert!(!referenced.contains(&pair("archive", "orders")));
    }
}
