use std::collections::HashMap;

use crate::classify::{classify, Classification};
use crate::error::DataError;
use crate::summary::{column_record, SummaryRecord};
use crate::table::{Cell, Column, Table};

// =============================================================================
// Rendering directives
// =============================================================================

/// How one column is drawn against the label axis.
///
/// The selection rule is inherited unchanged from the original system: a
/// fully coercible column draws as a line, and a column with any coercion
/// failure draws as bars with highlighted extrema. Coercion failure selects
/// the annotated path on purpose; it is not a bug to invert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
    BarWithExtrema,
}

/// One column's worth of plot instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub column: String,
    pub kind: SeriesKind,
    /// Plottable heights as (row index, y). Rows with a missing cell carry
    /// no point; non-numeric text falls back to its ordinal code.
    pub points: Vec<(usize, f64)>,
    /// Extremes over the column's coercible values, marker rows included.
    /// Only bar series carry extrema, and only when the column holds at
    /// least one coercible value.
    pub extrema: Option<SummaryRecord>,
}

/// Ordered rendering instructions for a whole table, built fresh per render
/// request and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPlan {
    pub label_column: String,
    /// Display value of the label cell for each row, the category axis.
    pub labels: Vec<String>,
    /// One entry per non-label column, preserving table order.
    pub series: Vec<Series>,
}

// =============================================================================
// Planning
// =============================================================================

/// Plan the chart for `table` against `label`. Classification runs exactly
/// once here and feeds both the line/bar decision and the extrema pass, so
/// a column cannot be numeric for one and categorical for the other.
pub fn plan(table: &Table, label: &str) -> Result<SeriesPlan, DataError> {
    let label_column = table
        .column(label)
        .ok_or_else(|| DataError::MissingLabelColumn(label.to_string()))?;

    let labels = label_column
        .cells
        .iter()
        .map(|cell| cell.to_string())
        .collect();

    let classes = classify(table);
    let series = table
        .columns()
        .iter()
        .filter(|column| column.name != label)
        .map(|column| plan_column(column, &classes))
        .collect();

    Ok(SeriesPlan {
        label_column: label.to_string(),
        labels,
        series,
    })
}

fn plan_column(column: &Column, classes: &Classification) -> Series {
    if classes.is_numeric(&column.name) {
        Series {
            column: column.name.clone(),
            kind: SeriesKind::Line,
            points: numeric_points(column),
            extrema: None,
        }
    } else {
        Series {
            column: column.name.clone(),
            kind: SeriesKind::BarWithExtrema,
            points: bar_points(column),
            extrema: column_record(column),
        }
    }
}

fn numeric_points(column: &Column) -> Vec<(usize, f64)> {
    column
        .cells
        .iter()
        .enumerate()
        .filter_map(|(row, cell)| cell.as_number().map(|v| (row, v)))
        .collect()
}

/// Bar heights are best-effort: coercible values plot as themselves, and
/// genuinely non-numeric text plots at its ordinal code, its position in
/// first-appearance order among the column's distinct non-numeric values.
/// Missing cells plot nothing.
fn bar_points(column: &Column) -> Vec<(usize, f64)> {
    let mut ordinal_codes: HashMap<&str, f64> = HashMap::new();
    let mut points = Vec::new();

    for (row, cell) in column.cells.iter().enumerate() {
        let height = match cell {
            Cell::Missing => continue,
            _ => match cell.as_number() {
                Some(value) => value,
                None => {
                    let Cell::Text(text) = cell else { continue };
                    let next = ordinal_codes.len() as f64;
                    *ordinal_codes.entry(text.as_str()).or_insert(next)
                }
            },
        };
        points.push((row, height));
    }

    points
}
