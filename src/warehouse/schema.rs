use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Integer,
    BigInt,
    Double,
    Decimal,
    String,
    Boolean,
    Date,
    Timestamp,
    Unknown(String),
}

impl DataType {
    /// Maps a warehouse type name (`BIGINT`, `DECIMAL(18,3)`, `TIMESTAMP WITH TIME ZONE`, ...)
    /// onto the small set of kinds the pipeline cares about.
    pub fn from_sql_type(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();

        match base {
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "INT4" | "UTINYINT" | "USMALLINT"
            | "UINTEGER" => DataType::Integer,
            "BIGINT" | "INT8" | "INT64" | "UBIGINT" | "HUGEINT" | "UHUGEINT" => DataType::BigInt,
            "DOUBLE" | "FLOAT" | "REAL" | "FLOAT4" | "FLOAT8" | "FLOAT64" => DataType::Double,
            "DECIMAL" | "NUMERIC" | "BIGNUMERIC" => DataType::Decimal,
            "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "BPCHAR" | "UUID" => DataType::String,
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "DATE" => DataType::Date,
            t if t.starts_with("TIMESTAMP") || t == "DATETIME" => DataType::Timestamp,
            _ => DataType::Unknown(raw.trim().to_string()),
        }
    }

    pub fn to_sql_type(&self) -> String {
        match self {
            DataType::Integer => "INTEGER".to_string(),
            DataType::BigInt => "BIGINT".to_string(),
            DataType::Double => "DOUBLE".to_string(),
            DataType::Decimal => "DECIMAL".to_string(),
            DataType::String => "VARCHAR".to_string(),
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Timestamp => "TIMESTAMP".to_string(),
            DataType::Unknown(t) => t.clone(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::BigInt | DataType::Double | DataType::Decimal
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::Timestamp)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::String)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_type())
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_sql_type())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// `name (TYPE)`, the form used in prompts.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.name, self.data_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
