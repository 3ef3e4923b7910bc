use crate::catalog::Schema;

pub const NO_SCHEMA: &str = "No schema information available.";
pub const TABLE_PREFIX: &str = "Table: ";
const NO_COLUMNS: &str = "(no column information available)";

/// Flattens a schema into the line-oriented description used by the prompt and by the
/// offline generator.
pub fn describe_schema(schema: &Schema) -> Vec<String> {
    if schema.is_empty() {
        return vec![NO_SCHEMA.to_string()];
    }

    let mut lines = Vec::with_capacity(schema.tables.len() * 2);
    for (table, columns) in &schema.tables {
        lines.push(format!("{}{}", TABLE_PREFIX, table));
        if columns.is_empty() {
            lines.push(format!("Columns: {}", NO_COLUMNS));
        } else {
            let described = columns
                .iter()
                .map(|c| c.describe())
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("Columns: {}", described));
        }
    }
    lines
}

pub fn build_prompt(question: &str, schema_lines: &[String], project: &str, dataset: &str) -> String {
    format!(
        r#"### Instructions:
Your task is to translate a question into one valid SQL statement for the dataset described below.
Adhere to these rules:
- Use only the tables and columns listed in the schema; column names are case sensitive
- Reference tables by their full path (`{project}.{dataset}.<table>`) if needed
- Output only the SQL statement, with no explanation, comments or prose

### Project: {project}
### Dataset: {dataset}

### Schema:
{schema}

### Question:
{question}

### SQL:
"#,
        project = project,
        dataset = dataset,
        schema = schema_lines.join("\n"),
        question = question,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{ColumnSchema, DataType};

    #[test]
    fn empty_schema_gets_a_placeholder_line() {
        assert_eq!(describe_schema(&Schema::default()), vec![NO_SCHEMA.to_string()]);
    }

    #[test]
    fn tables_list_their_columns_or_a_note() {
        let mut schema = Schema::default();
        schema.insert(
            "orders",
            vec![
                ColumnSchema::new("id", DataType::BigInt),
                ColumnSchema::new("region", DataType::String),
            ],
        );
        schema.insert("staging", vec![]);

        assert_eq!(
            describe_schema(&schema),
            vec![
                "Table: orders",
                "Columns: id (BIGINT), region (VARCHAR)",
                "Table: staging",
                "Columns: (no column information available)",
            ]
        );
    }

    #[test]
    fn prompt_carries_question_verbatim() {
        let prompt = build_prompt(
            "which region sold the most?",
            &["Table: orders".to_string()],
            "acme",
            "sales",
        );
        assert!(prompt.contains("### Question:\nwhich region sold the most?\n"));
        assert!(prompt.contains("`acme.sales.<table>`"));
        assert!(prompt.contains("### Schema:\nTable: orders\n"));
    }
}
