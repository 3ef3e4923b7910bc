use duckdb::Connection;
use r2d2::ManageConnection;
use std::sync::Mutex;

/// Hands out connections that share one DuckDB instance with the project attached.
///
/// Each pooled connection is a clone of the root connection, so attached catalogs are
/// shared, but the `USE` default catalog is per connection and is set in `connect`.
pub struct DuckDBConnectionManager {
    root: Mutex<Connection>,
    project: String,
}

impl DuckDBConnectionManager {
    /// Opens an in-memory root instance and attaches `path` under the project name.
    pub fn attach(path: &str, project: &str) -> Result<Self, duckdb::Error> {
        let root = Connection::open_in_memory()?;
        root.execute_batch(&format!(
            "ATTACH '{}' AS {}",
            path.replace('\'', "''"),
            quote_ident(project)
        ))?;

        Ok(Self {
            root: Mutex::new(root),
            project: project.to_string(),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let conn = {
            let root = self.root.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            root.try_clone()?
        };
        conn.execute_batch(&format!("USE {}", quote_ident(&self.project)))?;
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Double-quotes an identifier for DuckDB.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quotes a string literal for DuckDB.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
