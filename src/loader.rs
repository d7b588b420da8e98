use std::path::Path;

use crate::error::DataError;
use crate::table::{Cell, Table};
use crate::workbook;

/// Parse a spreadsheet or delimited-text file into a table.
///
/// The extension alone selects the decoder; there is no content sniffing.
/// This is the single place where format ambiguity exists and it is
/// resolved by extension lookup.
///
/// Supported formats:
/// * `.csv` / `.tsv` - delimited text with a header row
/// * `.xlsx` / `.xlsm` - OOXML workbook, first worksheet
///
/// The file is read fully and closed before the table is returned; a failed
/// load never yields a partially populated table.
pub fn load(path: &Path) -> Result<Table, DataError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match extension.as_str() {
        "csv" => load_delimited(path, b',')?,
        "tsv" => load_delimited(path, b'\t')?,
        "xlsx" | "xlsm" => workbook::load(path)?,
        _ => {
            return Err(DataError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
        }
    };

    log::debug!(
        "loaded {}: {} columns, {} rows",
        path.display(),
        table.column_count(),
        table.row_count()
    );
    Ok(table)
}

fn load_delimited(path: &Path, delimiter: u8) -> Result<Table, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| DataError::parse(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::parse(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        // The csv reader rejects records whose field count differs from the
        // header, so every row below is already shape-checked.
        let record = record.map_err(|e| DataError::parse(path, e))?;
        rows.push(record.iter().map(Cell::from_raw).collect());
    }

    Table::new(headers, rows).map_err(|e| DataError::parse(path, e))
}
