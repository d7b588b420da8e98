//! OOXML workbook decoding for the spreadsheet side of the loader.
//!
//! An `.xlsx`/`.xlsm` file is a zip archive of XML parts. Only the pieces the
//! table model needs are touched: the workbook relationships (to locate the
//! first worksheet), the shared-strings table, and the worksheet cell grid.
//! Number formats, styles, and the legacy BIFF container are not interpreted.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::DataError;
use crate::table::{Cell, Table};

/// Decode the first worksheet of an OOXML workbook into a table. The first
/// populated row becomes the header; later rows shorter than the header pad
/// with missing cells, while rows wider than the header are a parse error.
pub fn load(path: &Path) -> Result<Table, DataError> {
    let file = File::open(path).map_err(|e| DataError::parse(path, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| DataError::parse(path, e))?;

    let relationships = read_relationships(&mut zip, path)?;
    let sheet_part = first_sheet_part(&mut zip, &relationships, path)?;
    let shared = read_shared_strings(&mut zip, path)?;
    let grid = read_sheet_grid(&mut zip, &sheet_part, &shared, path)?;

    table_from_grid(grid, path)
}

fn read_entry(zip: &mut ZipArchive<File>, name: &str, path: &Path) -> Result<Option<String>, DataError> {
    match zip.by_name(name) {
        Ok(mut entry) => {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| DataError::parse(path, format!("{}: {}", name, e)))?;
            Ok(Some(content))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(DataError::parse(path, format!("{}: {}", name, e))),
    }
}

fn required_entry(zip: &mut ZipArchive<File>, name: &str, path: &Path) -> Result<String, DataError> {
    read_entry(zip, name, path)?
        .ok_or_else(|| DataError::parse(path, format!("workbook part {} is missing", name)))
}

/// Relationship id to part path, from xl/_rels/workbook.xml.rels.
fn read_relationships(
    zip: &mut ZipArchive<File>,
    path: &Path,
) -> Result<HashMap<String, String>, DataError> {
    let content = required_entry(zip, "xl/_rels/workbook.xml.rels", path)?;
    let mut reader = Reader::from_str(&content);
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event().map_err(|e| DataError::parse(path, e))? {
            Event::Start(event) | Event::Empty(event)
                if event.local_name().as_ref() == b"Relationship" =>
            {
                let id = attribute_value(&event, b"Id", path)?;
                let target = attribute_value(&event, b"Target", path)?;
                if let Some((id, target)) = id.zip(target) {
                    // Targets are relative to xl/ unless rooted.
                    let part = match target.strip_prefix('/') {
                        Some(rooted) => rooted.to_string(),
                        None => format!("xl/{}", target),
                    };
                    relationships.insert(id, part);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(relationships)
}

/// Part path of the first sheet listed in xl/workbook.xml.
fn first_sheet_part(
    zip: &mut ZipArchive<File>,
    relationships: &HashMap<String, String>,
    path: &Path,
) -> Result<String, DataError> {
    let content = required_entry(zip, "xl/workbook.xml", path)?;
    let mut reader = Reader::from_str(&content);

    loop {
        match reader.read_event().map_err(|e| DataError::parse(path, e))? {
            Event::Start(event) | Event::Empty(event)
                if event.local_name().as_ref() == b"sheet" =>
            {
                // The relationship attribute is namespaced (r:id), so match
                // on the local name.
                if let Some(id) = attribute_value(&event, b"id", path)? {
                    return relationships.get(&id).cloned().ok_or_else(|| {
                        DataError::parse(path, format!("worksheet relationship {} is missing", id))
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(DataError::parse(path, "workbook has no worksheets"))
}

/// The shared-strings table, in index order. Phonetic runs are skipped.
fn read_shared_strings(zip: &mut ZipArchive<File>, path: &Path) -> Result<Vec<String>, DataError> {
    let content = match read_entry(zip, "xl/sharedStrings.xml", path)? {
        Some(content) => content,
        None => return Ok(Vec::new()),
    };
    let mut reader = Reader::from_str(&content);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event().map_err(|e| DataError::parse(path, e))? {
            Event::Start(event) => match event.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_item && !in_phonetic => in_text = true,
                _ => {}
            },
            Event::End(event) => match event.local_name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(text) if in_text => {
                current.push_str(&text.unescape().map_err(|e| DataError::parse(path, e))?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    Boolean,
    Error,
}

/// Sparse grid of one worksheet: rows of (column index, cell) pairs.
fn read_sheet_grid(
    zip: &mut ZipArchive<File>,
    part: &str,
    shared: &[String],
    path: &Path,
) -> Result<Vec<Vec<(usize, Cell)>>, DataError> {
    let content = required_entry(zip, part, path)?;
    let mut reader = Reader::from_str(&content);

    let mut grid: Vec<Vec<(usize, Cell)>> = Vec::new();
    let mut row: Vec<(usize, Cell)> = Vec::new();
    let mut next_column = 0usize;
    let mut column = 0usize;
    let mut kind = CellKind::Number;
    let mut value = String::new();
    let mut in_value = false;
    let mut in_inline = false;
    let mut in_inline_text = false;

    loop {
        match reader.read_event().map_err(|e| DataError::parse(path, e))? {
            Event::Start(event) | Event::Empty(event)
                if event.local_name().as_ref() == b"row" =>
            {
                row.clear();
                next_column = 0;
            }
            Event::End(event) if event.local_name().as_ref() == b"row" => {
                grid.push(std::mem::take(&mut row));
            }
            Event::Start(event) | Event::Empty(event)
                if event.local_name().as_ref() == b"c" =>
            {
                column = attribute_value(&event, b"r", path)?
                    .as_deref()
                    .and_then(reference_to_column)
                    .unwrap_or(next_column);
                next_column = column + 1;
                kind = match attribute_value(&event, b"t", path)?.as_deref() {
                    Some("s") => CellKind::SharedString,
                    Some("inlineStr") | Some("str") => CellKind::InlineString,
                    Some("b") => CellKind::Boolean,
                    Some("e") => CellKind::Error,
                    _ => CellKind::Number,
                };
                value.clear();
            }
            Event::End(event) if event.local_name().as_ref() == b"c" => {
                if let Some(cell) = decode_cell(kind, &value, shared, path)? {
                    row.push((column, cell));
                }
            }
            Event::Start(event) if event.local_name().as_ref() == b"v" => in_value = true,
            Event::End(event) if event.local_name().as_ref() == b"v" => in_value = false,
            Event::Start(event) if event.local_name().as_ref() == b"is" => in_inline = true,
            Event::End(event) if event.local_name().as_ref() == b"is" => in_inline = false,
            Event::Start(event) if in_inline && event.local_name().as_ref() == b"t" => {
                in_inline_text = true;
            }
            Event::End(event) if event.local_name().as_ref() == b"t" => in_inline_text = false,
            Event::Text(text) if in_value || in_inline_text => {
                value.push_str(&text.unescape().map_err(|e| DataError::parse(path, e))?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(grid)
}

fn decode_cell(
    kind: CellKind,
    value: &str,
    shared: &[String],
    path: &Path,
) -> Result<Option<Cell>, DataError> {
    if value.is_empty() && kind != CellKind::Error {
        return Ok(None);
    }
    let cell = match kind {
        CellKind::SharedString => {
            let index: usize = value
                .parse()
                .map_err(|_| DataError::parse(path, format!("bad shared string index '{}'", value)))?;
            let text = shared.get(index).ok_or_else(|| {
                DataError::parse(path, format!("shared string index {} out of range", index))
            })?;
            if text.trim().is_empty() {
                return Ok(None);
            }
            Cell::Text(text.clone())
        }
        CellKind::InlineString => {
            if value.trim().is_empty() {
                return Ok(None);
            }
            Cell::Text(value.to_string())
        }
        CellKind::Boolean | CellKind::Number => {
            let number: f64 = value
                .parse()
                .map_err(|_| DataError::parse(path, format!("bad numeric cell value '{}'", value)))?;
            Cell::Number(number)
        }
        CellKind::Error => {
            return Err(DataError::parse(path, format!("cell error value '{}'", value)));
        }
    };
    Ok(Some(cell))
}

/// Column index of an A1-style reference: "B2" is column 1.
fn reference_to_column(reference: &str) -> Option<usize> {
    let mut column = 0usize;
    let mut seen = false;
    for c in reference.chars() {
        if c.is_ascii_alphabetic() {
            column = column * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
            seen = true;
        } else {
            break;
        }
    }
    seen.then(|| column - 1)
}

fn attribute_value(
    event: &quick_xml::events::BytesStart<'_>,
    local_name: &[u8],
    path: &Path,
) -> Result<Option<String>, DataError> {
    for attribute in event.attributes() {
        let attribute = attribute.map_err(|e| DataError::parse(path, e))?;
        if attribute.key.local_name().as_ref() == local_name {
            let value = attribute
                .unescape_value()
                .map_err(|e| DataError::parse(path, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Turn the sparse grid into a table: first populated row is the header,
/// gaps materialize as missing cells.
fn table_from_grid(grid: Vec<Vec<(usize, Cell)>>, path: &Path) -> Result<Table, DataError> {
    let mut rows = grid.into_iter();
    let header_cells = match rows.next() {
        Some(cells) => cells,
        None => return Table::new(Vec::new(), Vec::new()).map_err(|e| DataError::parse(path, e)),
    };

    let width = header_cells
        .iter()
        .map(|(column, _)| column + 1)
        .max()
        .unwrap_or(0);
    let mut headers = vec![String::new(); width];
    for (column, cell) in header_cells {
        headers[column] = cell.to_string();
    }

    let mut data = Vec::new();
    for (row_index, sparse) in rows.enumerate() {
        let mut cells = vec![Cell::Missing; width];
        for (column, cell) in sparse {
            if column >= width {
                return Err(DataError::parse(
                    path,
                    format!("row {} has more cells than headers", row_index + 2),
                ));
            }
            cells[column] = cell;
        }
        data.push(cells);
    }

    Table::new(headers, data).map_err(|e| DataError::parse(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="5" uniqueCount="5"><si><t>Product</t></si><si><t>Quantity</t></si><si><t>Sold</t></si><si><t>A</t></si><si><t>B</t></si></sst>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
<row r="2"><c r="A2" t="s"><v>3</v></c><c r="B2"><v>10</v></c><c r="C2"><v>5</v></c></row>
<row r="3"><c r="A3" t="s"><v>4</v></c><c r="B3"><v>20</v></c><c r="C3"><v>15</v></c></row>
</sheetData></worksheet>"#;

    fn write_workbook(name: &str, sheet: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "trendgraph-workbook-{}-{}.xlsx",
            std::process::id(),
            name
        ));
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (entry, content) in [
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/sharedStrings.xml", SHARED),
            ("xl/worksheets/sheet1.xml", sheet),
        ] {
            zip.start_file(entry, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn test_load_workbook() {
        let path = write_workbook("sales", SHEET);
        let table = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["Product", "Quantity", "Sold"]
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("Product").unwrap().cells,
            vec![Cell::Text("A".to_string()), Cell::Text("B".to_string())]
        );
        assert_eq!(
            table.column("Quantity").unwrap().cells,
            vec![Cell::Number(10.0), Cell::Number(20.0)]
        );
    }

    #[test]
    fn test_sparse_rows_pad_with_missing() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="B2"><v>10</v></c></row>
</sheetData></worksheet>"#;
        let path = write_workbook("sparse", sheet);
        let table = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.column("Product").unwrap().cells[0], Cell::Missing);
        assert_eq!(table.column("Quantity").unwrap().cells[0], Cell::Number(10.0));
    }

    #[test]
    fn test_inline_strings_decode() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Label</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>North</t></is></c></row>
</sheetData></worksheet>"#;
        let path = write_workbook("inline", sheet);
        let table = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            table.column("Label").unwrap().cells[0],
            Cell::Text("North".to_string())
        );
    }

    #[test]
    fn test_row_wider_than_header_is_a_parse_error() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c></row>
<row r="2"><c r="A2"><v>1</v></c><c r="B2"><v>2</v></c></row>
</sheetData></worksheet>"#;
        let path = write_workbook("wide", sheet);
        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, DataError::Parse { .. }));
    }

    #[test]
    fn test_corrupt_archive_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!(
            "trendgraph-workbook-{}-corrupt.xlsx",
            std::process::id()
        ));
        std::fs::write(&path, b"this is not a zip archive").unwrap();
        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, DataError::Parse { .. }));
    }

    #[test]
    fn test_reference_to_column() {
        assert_eq!(reference_to_column("A1"), Some(0));
        assert_eq!(reference_to_column("B2"), Some(1));
        assert_eq!(reference_to_column("Z9"), Some(25));
        assert_eq!(reference_to_column("AA10"), Some(26));
        assert_eq!(reference_to_column("7"), None);
    }
}
