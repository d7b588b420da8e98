use std::fmt;

use thiserror::Error;

/// A single cell value. Cells are tagged rather than stringly typed so that
/// numeric coercion is an explicit, total function.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a cell from a raw delimited-text field. Whitespace-only fields
    /// are missing; fields matching the standard float grammar (sign and
    /// decimal point, no locale separators) become numbers.
    pub fn from_raw(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => Cell::Number(value),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    /// Coerce this cell to a number. Text is re-parsed so a string-typed
    /// spreadsheet cell holding "12" still coerces.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => text.trim().parse::<f64>().ok(),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(value) => write!(f, "{}", value),
            Cell::Text(text) => write!(f, "{}", text),
        }
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

/// Structural problems detected while assembling a table. The loader wraps
/// these into `DataError::Parse` together with the offending path.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("empty column name at position {0}")]
    EmptyColumnName(usize),
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// The in-memory dataset: an ordered sequence of named columns aligned by
/// row index. Column names are unique and order is significant; the first
/// column conventionally supplies the label axis.
///
/// A table is only ever created whole. Construction validates the header
/// and row shape, so a value of this type always satisfies the equal-length
/// invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Assemble a table from a header row and data rows. Every row must
    /// have exactly one value per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Table, TableError> {
        for (index, name) in headers.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(TableError::EmptyColumnName(index));
            }
            if headers[..index].contains(name) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }

        let expected = headers.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column {
                name,
                cells: Vec::with_capacity(rows.len()),
            })
            .collect();

        let row_count = rows.len();
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != expected {
                return Err(TableError::RaggedRow {
                    row: row_index,
                    found: row.len(),
                    expected,
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.cells.push(cell);
            }
        }

        Ok(Table { columns, row_count })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// True only for the zero-column, zero-row table. A headers-only table
    /// with no data rows is valid and not considered empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.row_count == 0
    }

    /// The cells of one row, in column order.
    pub fn row(&self, index: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.cells[index]).collect()
    }
}
