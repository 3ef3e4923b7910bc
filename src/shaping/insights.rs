use crate::warehouse::result::format_number;
use crate::warehouse::{ResultSet, Value};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightIcon {
    Records,
    Columns,
    Quality,
    Range,
    Time,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub text: String,
    pub icon: InsightIcon,
}

impl Insight {
    fn new(icon: InsightIcon, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon,
        }
    }
}

const RANGED_COLUMNS: usize = 2;

pub fn derive_insights(result: &ResultSet) -> Vec<Insight> {
    let mut insights = vec![Insight::new(
        InsightIcon::Records,
        format!(
            "{} records returned across {} columns.",
            result.row_count(),
            result.column_count()
        ),
    )];

    if result.is_empty() {
        insights.push(Insight::new(InsightIcon::Info, "The query returned no rows."));
        return insights;
    }

    let numeric = result.numeric_columns();
    insights.push(Insight::new(
        InsightIcon::Columns,
        format!(
            "{} numeric and {} text columns.",
            numeric.len(),
            result.column_count() - numeric.len()
        ),
    ));

    let with_nulls = (0..result.column_count())
        .filter(|&i| result.column_values(i).any(Value::is_null))
        .count();
    let quality = match with_nulls {
        0 => "No missing values in the result.".to_string(),
        1 => "1 column has missing values.".to_string(),
        n => format!("{} columns have missing values.", n),
    };
    insights.push(Insight::new(InsightIcon::Quality, quality));

    for &i in numeric.iter().take(RANGED_COLUMNS) {
        if let Some((min, max)) = numeric_range(result, i) {
            insights.push(Insight::new(
                InsightIcon::Range,
                format!(
                    "{} ranges from {} to {}.",
                    result.columns[i].name,
                    format_number(min),
                    format_number(max)
                ),
            ));
        }
    }

    if let Some(insight) = time_range(result) {
        insights.push(insight);
    }

    insights
}

fn numeric_range(result: &ResultSet, column: usize) -> Option<(f64, f64)> {
    result
        .column_values(column)
        .filter_map(Value::as_f64)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
}

/// Span of the first column whose name mentions a year.
fn time_range(result: &ResultSet) -> Option<Insight> {
    let index = result
        .columns
        .iter()
        .position(|c| c.name.to_lowercase().contains("year"))?;
    let name = &result.columns[index].name;

    let (first, last) = match numeric_range(result, index) {
        Some((min, max)) => (format_number(min), format_number(max)),
        None => {
            let mut labels: Vec<String> = result
                .column_values(index)
                .filter(|v| !v.is_null())
                .map(ToString::to_string)
                .collect();
            labels.sort();
            (labels.first()?.clone(), labels.last()?.clone())
        }
    };

    Some(Insight::new(
        InsightIcon::Time,
        format!("Data spans {} {} to {}.", name, first, last),
    ))
}
