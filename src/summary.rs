use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::Classification;
use crate::error::DataError;
use crate::table::{Column, Table};

/// Extremes of one numeric column. Ties are reported in full: every row
/// achieving the maximum or minimum appears, not an arbitrary single one,
/// because the planner places a marker on each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub max: f64,
    pub min: f64,
    /// Row indices achieving `max`, in row order.
    pub max_rows: Vec<usize>,
    /// Row indices achieving `min`, in row order.
    pub min_rows: Vec<usize>,
}

/// Compute max/min records for every column classified numeric. Recomputed
/// on every call so the result always reflects the table passed in.
///
/// An empty-but-valid table (columns with zero rows) returns an empty map;
/// only the zero-column, zero-row table is an `EmptyDataset` failure.
pub fn summarize(
    table: &Table,
    classes: &Classification,
) -> Result<BTreeMap<String, SummaryRecord>, DataError> {
    if table.is_empty() {
        return Err(DataError::EmptyDataset);
    }

    let mut records = BTreeMap::new();
    for column in table.columns() {
        if !classes.is_numeric(&column.name) {
            continue;
        }
        if let Some(record) = column_record(column) {
            records.insert(column.name.clone(), record);
        }
    }
    Ok(records)
}

/// Extremes over one column's coercible values, missing cells skipped.
/// None when the column holds no coercible value at all.
pub(crate) fn column_record(column: &Column) -> Option<SummaryRecord> {
    let mut record: Option<SummaryRecord> = None;

    for (row, value) in column
        .cells
        .iter()
        .enumerate()
        .filter_map(|(row, cell)| cell.as_number().map(|v| (row, v)))
    {
        match record.as_mut() {
            None => {
                record = Some(SummaryRecord {
                    max: value,
                    min: value,
                    max_rows: vec![row],
                    min_rows: vec![row],
                });
            }
            Some(r) => {
                if value > r.max {
                    r.max = value;
                    r.max_rows = vec![row];
                } else if value == r.max {
                    r.max_rows.push(row);
                }
                if value < r.min {
                    r.min = value;
                    r.min_rows = vec![row];
                } else if value == r.min {
                    r.min_rows.push(row);
                }
            }
        }
    }

    record
}
