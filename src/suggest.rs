//! Example questions for a dataset, guessed from column names and sample rows.

use crate::warehouse::{DataType, ResultSet};
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_QUESTIONS: [&str; 4] = [
    "📊 Show me the main trends",
    "📈 What are the key metrics?",
    "🌍 Summarize the dataset for me",
    "🔍 Find interesting correlations",
];

const SUGGESTION_COUNT: usize = 4;

const TIME_KEYWORDS: [&str; 8] = [
    "date", "time", "timestamp", "year", "month", "day", "created", "updated",
];
const METRIC_KEYWORDS: [&str; 10] = [
    "amount", "count", "total", "sum", "avg", "revenue", "sales", "price", "cost", "value",
];
const CATEGORY_KEYWORDS: [&str; 7] = [
    "type", "category", "group", "status", "region", "department", "segment",
];

#[derive(Debug, Error, PartialEq)]
pub enum SuggestError {
    #[error("sample row {row} has {found} values but {expected} columns are declared")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Always returns exactly four questions.
pub fn suggest(
    dataset_name: Option<&str>,
    columns: Option<&[String]>,
    sample: Option<&ResultSet>,
) -> Vec<String> {
    let dataset_name = dataset_name.filter(|name| !name.is_empty());
    let columns = columns.filter(|cols| !cols.is_empty());
    let sample = sample.filter(|rows| !rows.is_empty());

    if dataset_name.is_none() && columns.is_none() && sample.is_none() {
        debug!("No context available, returning default questions");
        return defaults();
    }

    let mut candidates = Vec::new();
    if let Some(columns) = columns {
        candidates.extend(from_column_names(columns, dataset_name));
    }
    if let Some(sample) = sample {
        match from_sample_rows(sample, dataset_name) {
            Ok(questions) => candidates.extend(questions),
            Err(e) => error!("Error analyzing sample data: {}", e),
        }
    }

    let mut questions: Vec<String> = Vec::with_capacity(SUGGESTION_COUNT);
    let padding = DEFAULT_QUESTIONS.iter().map(|q| q.to_string());
    for question in candidates.into_iter().chain(padding) {
        if questions.len() == SUGGESTION_COUNT {
            break;
        }
        if !questions.contains(&question) {
            questions.push(question);
        }
    }
    questions
}

fn defaults() -> Vec<String> {
    DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

fn in_dataset(dataset_name: Option<&str>) -> String {
    dataset_name
        .map(|name| format!(" in {}", name))
        .unwrap_or_default()
}

fn matching<'a>(columns: &'a [String], keywords: &[&str]) -> Option<&'a String> {
    columns.iter().find(|col| {
        let col = col.to_lowercase();
        keywords.iter().any(|k| col.contains(k))
    })
}

fn from_column_names(columns: &[String], dataset_name: Option<&str>) -> Vec<String> {
    let suffix = in_dataset(dataset_name);
    let time = matching(columns, &TIME_KEYWORDS);
    let metric = matching(columns, &METRIC_KEYWORDS);
    let category = matching(columns, &CATEGORY_KEYWORDS);

    let mut questions = Vec::new();
    if let Some(time) = time {
        questions.push(format!("📈 What's the trend over {}{}?", time, suffix));
        if let Some(metric) = metric {
            questions.push(format!("📊 How does {} change over {}?", metric, time));
        }
    }
    if let (Some(category), Some(metric)) = (category, metric) {
        questions.push(format!("🔍 Compare {} across different {}", metric, category));
    }
    if columns.len() > 3 {
        questions.push(format!("📋 What are the key patterns{}?", suffix));
    }
    questions
}

/// Classifies sample columns by their declared types rather than their names.
fn from_sample_rows(
    sample: &ResultSet,
    dataset_name: Option<&str>,
) -> Result<Vec<String>, SuggestError> {
    let expected = sample.column_count();
    if let Some((row, values)) = sample
        .rows
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != expected)
    {
        return Err(SuggestError::RowWidth {
            row,
            found: values.len(),
            expected,
        });
    }

    let numeric = columns_where(sample, DataType::is_numeric);
    let textual = columns_where(sample, DataType::is_textual);
    let temporal = columns_where(sample, DataType::is_temporal);

    let suffix = in_dataset(dataset_name);
    let mut questions = Vec::new();

    if let Some(when) = temporal.first() {
        if let Some(metric) = numeric.first() {
            questions.push(format!("📈 Show {} trends over {}", metric, when));
        }
        questions.push(format!("📅 What patterns exist over {}{}?", when, suffix));
    }
    if let [first, second, ..] = numeric.as_slice() {
        questions.push(format!(
            "🔗 What's the correlation between {} and {}?",
            first, second
        ));
    }
    if let (Some(category), Some(metric)) = (textual.first(), numeric.first()) {
        questions.push(format!("📊 Which {} has the highest {}?", category, metric));
    }
    if let Some(metric) = numeric.first() {
        questions.push(format!("📉 What's the distribution of {}{}?", metric, suffix));
        questions.push(format!("⚠️ Are there any outliers in {}{}?", metric, suffix));
    }
    Ok(questions)
}

fn columns_where(sample: &ResultSet, pred: fn(&DataType) -> bool) -> Vec<&str> {
    sample
        .columns
        .iter()
        .filter(|c| pred(&c.data_type))
        .map(|c| c.name.as_str())
        .collect()
}
