use crate::warehouse::{ResultSet, Value};
use serde::Serialize;
use thiserror::Error;

/// Largest result rendered as a bar chart.
pub const BAR_ROW_LIMIT: usize = 20;
pub const SCATTER_POINT_LIMIT: usize = 1000;
const TICK_ANGLE: i32 = -45;

pub const EMPTY_RESULT_TEXT: &str = "The query returned no rows.";

#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("column '{0}' has no plottable values")]
    NoPlottableValues(String),
    #[error("column index {0} is out of range")]
    MissingColumn(usize),
}

/// Series data for a two-axis chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisChart {
    pub title: String,
    pub x_column: String,
    pub y_column: String,
    pub x: Vec<Value>,
    pub y: Vec<Option<f64>>,
    pub tick_angle: i32,
    pub soft_gridlines: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Indicator { title: String, value: Value },
    Bar(AxisChart),
    Scatter(AxisChart),
    Line(AxisChart),
    TextAnnotation { title: String, text: String },
}

impl ChartSpec {
    pub fn annotation(title: impl Into<String>, text: impl Into<String>) -> Self {
        ChartSpec::TextAnnotation {
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChartSpec::Indicator { .. } => "indicator",
            ChartSpec::Bar(_) => "bar",
            ChartSpec::Scatter(_) => "scatter",
            ChartSpec::Line(_) => "line",
            ChartSpec::TextAnnotation { .. } => "text_annotation",
        }
    }
}

/// Picks a chart for `result` from the question wording and the column types.
pub fn select_chart(result: &ResultSet, question: &str) -> Result<ChartSpec, ShapeError> {
    if result.is_empty() {
        return Ok(ChartSpec::annotation("No data", EMPTY_RESULT_TEXT));
    }

    let question = question.to_lowercase();
    if question.contains("count") || question.contains("total") {
        let value = if result.row_count() == 1 {
            result.rows[0].first().cloned().unwrap_or(Value::Null)
        } else {
            Value::Int(result.row_count() as i64)
        };
        return Ok(ChartSpec::Indicator {
            title: indicator_title(result),
            value,
        });
    }

    let numeric = result.numeric_columns();
    if result.column_count() >= 2 && !numeric.is_empty() {
        let x = 0;
        let y = numeric.iter().copied().find(|&i| i != x).unwrap_or(numeric[0]);

        if result.row_count() <= BAR_ROW_LIMIT {
            let chart = axis_chart(result, x, y, result.rows.iter())?;
            return Ok(ChartSpec::Bar(chart));
        }
        if numeric.len() >= 2 {
            let stride = result.row_count().div_ceil(SCATTER_POINT_LIMIT);
            let rows = result.rows.iter().step_by(stride).take(SCATTER_POINT_LIMIT);
            let mut chart = axis_chart(result, numeric[0], numeric[1], rows)?;
            chart.title = format!("{} vs {}", chart.y_column, chart.x_column);
            return Ok(ChartSpec::Scatter(chart));
        }
        let chart = axis_chart(result, x, y, result.rows.iter())?;
        return Ok(ChartSpec::Line(chart));
    }

    Ok(ChartSpec::annotation(
        "Results",
        format!(
            "{} rows returned. See the table view for the raw data.",
            result.row_count()
        ),
    ))
}

fn indicator_title(result: &ResultSet) -> String {
    if result.row_count() == 1 {
        result
            .columns
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Value".to_string())
    } else {
        "Row count".to_string()
    }
}

fn axis_chart<'a>(
    result: &ResultSet,
    x: usize,
    y: usize,
    rows: impl Iterator<Item = &'a Vec<Value>>,
) -> Result<AxisChart, ShapeError> {
    let x_column = result.columns.get(x).ok_or(ShapeError::MissingColumn(x))?;
    let y_column = result.columns.get(y).ok_or(ShapeError::MissingColumn(y))?;

    let (xs, ys): (Vec<Value>, Vec<Option<f64>>) = rows
        .map(|row| {
            let xv = row.get(x).cloned().unwrap_or(Value::Null);
            let yv = row.get(y).and_then(Value::as_f64);
            (xv, yv)
        })
        .unzip();

    if ys.iter().all(Option::is_none) {
        return Err(ShapeError::NoPlottableValues(y_column.name.clone()));
    }

    Ok(AxisChart {
        title: format!("{} by {}", y_column.name, x_column.name),
        x_column: x_column.name.clone(),
        y_column: y_column.name.clone(),
        x: xs,
        y: ys,
        tick_angle: TICK_ANGLE,
        soft_gridlines: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{ColumnSchema, DataType};

    fn regions(rows: usize) -> ResultSet {
        ResultSet::new(
            vec![
                ColumnSchema::new("region", DataType::String),
                ColumnSchema::new("revenue", DataType::Double),
            ],
            (0..rows)
                .map(|i| vec![Value::Text(format!("r{}", i)), Value::Float(i as f64 * 1.5)])
                .collect(),
        )
    }

    #[test]
    fn compare_by_region_is_a_bar_chart() {
        let chart = select_chart(&regions(5), "compare revenue by region").unwrap();
        match chart {
            ChartSpec::Bar(bar) => {
                assert_eq!(bar.x_column, "region");
                assert_eq!(bar.y_column, "revenue");
                assert_eq!(bar.y.len(), 5);
                assert_eq!(bar.tick_angle, -45);
                assert!(bar.soft_gridlines);
            }
            other => panic!("expected a bar chart, got {:?}", other),
        }
    }

    #[test]
    fn count_questions_get_an_indicator() {
        let single = ResultSet::new(
            vec![ColumnSchema::new("total_records", DataType::BigInt)],
            vec![vec![Value::Int(42)]],
        );
        assert_eq!(
            select_chart(&single, "how many rows in total?").unwrap(),
            ChartSpec::Indicator {
                title: "total_records".to_string(),
                value: Value::Int(42)
            }
        );
        assert_eq!(
            select_chart(&regions(7), "count regions").unwrap(),
            ChartSpec::Indicator {
                title: "Row count".to_string(),
                value: Value::Int(7)
            }
        );
    }

    #[test]
    fn long_results_become_line_charts() {
        assert_eq!(select_chart(&regions(30), "revenue by region").unwrap().kind(), "line");
    }

    #[test]
    fn wide_numeric_results_are_sampled_into_a_scatter() {
        let result = ResultSet::new(
            vec![
                ColumnSchema::new("price", DataType::Double),
                ColumnSchema::new("quantity", DataType::BigInt),
            ],
            (0..2500)
                .map(|i| vec![Value::Float(i as f64), Value::Int(i)])
                .collect(),
        );
        match select_chart(&result, "price against quantity").unwrap() {
            ChartSpec::Scatter(scatter) => {
                assert_eq!(scatter.x_column, "price");
                assert_eq!(scatter.y_column, "quantity");
                assert!(scatter.x.len() <= SCATTER_POINT_LIMIT);
                assert_eq!(scatter.x[1], Value::Float(3.0));
            }
            other => panic!("expected a scatter chart, got {:?}", other),
        }
    }

    #[test]
    fn empty_results_are_annotated_even_for_counts() {
        let empty = ResultSet::new(regions(0).columns, vec![]);
        assert_eq!(
            select_chart(&empty, "count everything").unwrap(),
            ChartSpec::annotation("No data", EMPTY_RESULT_TEXT)
        );
    }

    #[test]
    fn text_only_results_get_an_annotation() {
        let result = ResultSet::new(
            vec![ColumnSchema::new("name", DataType::String)],
            vec![vec![Value::Text("a".into())]],
        );
        assert_eq!(select_chart(&result, "list names").unwrap().kind(), "text_annotation");
    }

    #[test]
    fn all_null_value_column_cannot_be_plotted() {
        let result = ResultSet::new(
            vec![
                ColumnSchema::new("region", DataType::String),
                ColumnSchema::new("revenue", DataType::Double),
            ],
            vec![vec![Value::Text("north".into()), Value::Null]],
        );
        assert_eq!(
            select_chart(&result, "revenue by region"),
            Err(ShapeError::NoPlottableValues("revenue".to_string()))
        );
    }
}
