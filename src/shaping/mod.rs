//! Turns an executed result set into something a presentation layer can draw:
//! one chart, a handful of insight sentences and a truncated table.

pub mod chart;
pub mod insights;

pub use chart::{AxisChart, ChartSpec, ShapeError};
pub use insights::{Insight, InsightIcon};

use crate::warehouse::{ResultSet, Value};
use serde::Serialize;
use tracing::warn;

/// Display copy of a result set, capped in both directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    pub total_columns: usize,
    pub rows_truncated: bool,
    pub columns_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedResult {
    pub chart: ChartSpec,
    pub insights: Vec<Insight>,
    pub table: TableView,
}

pub struct ResultShaper {
    max_rows: usize,
    max_columns: usize,
}

impl Default for ResultShaper {
    fn default() -> Self {
        Self {
            max_rows: 50,
            max_columns: 8,
        }
    }
}

impl ResultShaper {
    pub fn new(max_rows: usize, max_columns: usize) -> Self {
        Self {
            max_rows,
            max_columns,
        }
    }

    /// Never fails: a chart that cannot be built is replaced by a text placeholder.
    pub fn shape(&self, result: &ResultSet, question: &str) -> ShapedResult {
        let chart = chart::select_chart(result, question).unwrap_or_else(|e| {
            warn!("Falling back to a text placeholder for the chart: {}", e);
            ChartSpec::annotation("Chart unavailable", format!("Could not build a chart: {}", e))
        });

        ShapedResult {
            chart,
            insights: insights::derive_insights(result),
            table: self.table_view(result),
        }
    }

    pub fn table_view(&self, result: &ResultSet) -> TableView {
        let width = result.column_count().min(self.max_columns);

        TableView {
            columns: result.columns[..width].iter().map(|c| c.name.clone()).collect(),
            rows: result
                .rows
                .iter()
                .take(self.max_rows)
                .map(|row| {
                    (0..width)
                        .map(|i| match row.get(i) {
                            Some(Value::Null) | None => String::new(),
                            Some(v) => v.to_string(),
                        })
                        .collect()
                })
                .collect(),
            total_rows: result.row_count(),
            total_columns: result.column_count(),
            rows_truncated: result.row_count() > self.max_rows,
            columns_truncated: result.column_count() > self.max_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{ColumnSchema, DataType};

    fn wide(rows: usize, cols: usize) -> ResultSet {
        ResultSet::new(
            (0..cols)
                .map(|c| ColumnSchema::new(format!("c{}", c), DataType::BigInt))
                .collect(),
            (0..rows)
                .map(|r| (0..cols).map(|c| Value::Int((r * c) as i64)).collect())
                .collect(),
        )
    }

    #[test]
    fn table_view_caps_rows_and_columns() {
        let view = ResultShaper::default().table_view(&wide(60, 10));
        assert_eq!(view.columns.len(), 8);
        assert_eq!(view.rows.len(), 50);
        assert_eq!(view.rows[2][3], "6");
        assert_eq!((view.total_rows, view.total_columns), (60, 10));
        assert!(view.rows_truncated && view.columns_truncated);
    }

    #[test]
    fn empty_result_shapes_without_panicking() {
        let shaped = ResultShaper::default().shape(&wide(0, 3), "total revenue");
        assert_eq!(shaped.chart.kind(), "text_annotation");
        assert!(shaped.table.rows.is_empty());
        assert!(shaped.insights.iter().all(|i| i.icon != InsightIcon::Range));
    }

    #[test]
    fn unplottable_chart_degrades_to_placeholder() {
        let result = ResultSet::new(
            vec![
                ColumnSchema::new("region", DataType::String),
                ColumnSchema::new("revenue", DataType::Double),
            ],
            vec![vec![Value::Text("north".into()), Value::Null]],
        );
        let shaped = ResultShaper::default().shape(&result, "revenue by region");
        assert_eq!(
            shaped.chart,
            ChartSpec::annotation(
                "Chart unavailable",
                "Could not build a chart: column 'revenue' has no plottable values"
            )
        );
        assert_eq!(shaped.table.rows, vec![vec!["north".to_string(), String::new()]]);
        assert!(!shaped.insights.is_empty());
    }

    #[test]
    fn charts_serialize_with_a_kind_tag() {
        let json = serde_json::to_value(ChartSpec::annotation("t", "x")).unwrap();
        assert_eq!(json["kind"], "text_annotation");
    }
}
