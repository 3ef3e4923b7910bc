use crate::warehouse::schema::{ColumnSchema, DataType};
use serde::Serialize;
use std::fmt;

/// A single scalar cell of a result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", format_number(*v)),
            Value::Text(s) | Value::Timestamp(s) => f.write_str(s),
        }
    }
}

/// Renders a float without trailing noise: `3` instead of `3.0`, two decimals otherwise.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

/// Rows returned by the warehouse. Column names and types come from the executed
/// query, not from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<ColumnSchema>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnSchema>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Iterates the cells of one column; rows that are too short yield `Null`.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&Value::Null))
    }

    /// Indices of numeric columns, by declared type or, for untyped columns, by the values.
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| {
                let declared = &self.columns[i].data_type;
                if declared.is_numeric() {
                    return true;
                }
                matches!(declared, DataType::Unknown(_)) && {
                    let mut values = self.column_values(i).filter(|v| !v.is_null()).peekable();
                    values.peek().is_some() && values.all(|v| v.as_f64().is_some())
                }
            })
            .collect()
    }

    /// Renders the first `max_rows` rows as a markdown table.
    pub fn to_markdown(&self, max_rows: usize) -> String {
        let mut out = String::new();

        out.push_str("| ");
        for col in &self.columns {
            out.push_str(&format!("{} | ", escape_cell(&col.name)));
        }
        out.push_str("\n| ");
        for _ in 0..self.columns.len() {
            out.push_str("--- | ");
        }
        out.push('\n');

        for row in self.rows.iter().take(max_rows) {
            out.push_str("| ");
            for i in 0..self.columns.len() {
                let cell = row.get(i).unwrap_or(&Value::Null);
                out.push_str(&format!("{} | ", escape_cell(&cell.to_string())));
            }
            out.push('\n');
        }

        if self.rows.len() > max_rows {
            out.push_str(&format!(
                "\n_Showing {} of {} rows._\n",
                max_rows,
                self.rows.len()
            ));
        }

        out
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
