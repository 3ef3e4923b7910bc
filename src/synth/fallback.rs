//! Keyword-triggered SQL templates used when no language model is available.

use crate::catalog::split_dataset_id;
use crate::synth::prompt::TABLE_PREFIX;
use crate::warehouse::pool::quote_literal;

const FIRST_ROWS: [&str; 3] = ["first 10 rows", "show me the first 10", "first ten rows"];
const COUNT_ROWS: [&str; 3] = ["total number of records", "count records", "how many rows"];
const LIST_COLUMNS: [&str; 3] = ["what columns", "show columns", "column names"];
const SUMMARY: [&str; 3] = ["summary", "describe", "overview"];

/// Example phrasings understood offline, for guidance messages.
pub const SUPPORTED_PHRASES: [&str; 4] = [
    "show me the first 10 rows",
    "how many rows are there",
    "what columns are available",
    "give me a summary",
];

/// The table a templated query should read from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TableRef {
    dataset: String,
    table: String,
}

/// Picks the table from a `dataset.table` identifier, or else from the first table of
/// the schema description.
fn resolve_table(schema_lines: &[String], dataset_id: &str) -> Option<TableRef> {
    let (dataset, table) = split_dataset_id(dataset_id);
    if let Some(table) = table.filter(|_| !dataset.is_empty()) {
        return Some(TableRef {
            dataset: dataset.to_string(),
            table: table.to_string(),
        });
    }

    schema_lines
        .iter()
        .find_map(|line| line.strip_prefix(TABLE_PREFIX))
        .map(str::trim)
        .filter(|table| !table.is_empty())
        .map(|table| TableRef {
            dataset: dataset.to_string(),
            table: table.to_string(),
        })
}

fn mentions(question: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| question.contains(phrase))
}

/// Returns a templated query for a recognized phrasing, or `None` when the question
/// matches nothing (or no table can be resolved).
pub fn generate_basic_sql(
    question: &str,
    schema_lines: &[String],
    project: &str,
    dataset: &str,
) -> Option<String> {
    let question = question.to_lowercase();
    let target = resolve_table(schema_lines, dataset)?;
    let table_ref = format!("`{}.{}.{}`", project, target.dataset, target.table);

    if mentions(&question, &FIRST_ROWS) {
        Some(format!("SELECT * FROM {} LIMIT 10", table_ref))
    } else if mentions(&question, &COUNT_ROWS) {
        Some(format!("SELECT COUNT(*) as total_records FROM {}", table_ref))
    } else if mentions(&question, &LIST_COLUMNS) {
        Some(format!(
            "SELECT column_name, data_type FROM `{}.{}.INFORMATION_SCHEMA.COLUMNS` WHERE table_name = {}",
            project,
            target.dataset,
            quote_literal(&target.table)
        ))
    } else if mentions(&question, &SUMMARY) {
        Some(format!("SELECT * FROM {} LIMIT 5", table_ref))
    } else {
        None
    }
}
