use std::io::{self, Write};

use crate::table::Table;

/// A fixed set of columns a view is allowed to show. The original tool's
/// grid was hard-wired to the sales schema below; the generic grid is the
/// fallback for any other dataset.
#[derive(Debug, Clone)]
pub struct DisplaySchema {
    pub columns: Vec<String>,
}

impl DisplaySchema {
    /// The original display contract: exactly Product, Quantity, Sold.
    pub fn sales() -> DisplaySchema {
        DisplaySchema {
            columns: vec![
                "Product".to_string(),
                "Quantity".to_string(),
                "Sold".to_string(),
            ],
        }
    }

    /// True when every schema column exists in the table.
    pub fn matches(&self, table: &Table) -> bool {
        self.columns
            .iter()
            .all(|name| table.column(name).is_some())
    }
}

/// Render the whole table as a padded text grid.
pub fn render_into(table: &Table, out: &mut impl Write) -> io::Result<()> {
    let names: Vec<&str> = table.column_names().collect();
    render_columns(table, &names, out)
}

/// Render only the schema's columns, in schema order. Falls back to the
/// generic grid when the schema does not match the table.
pub fn render_schema_into(
    table: &Table,
    schema: &DisplaySchema,
    out: &mut impl Write,
) -> io::Result<()> {
    if !schema.matches(table) {
        return render_into(table, out);
    }
    let names: Vec<&str> = schema.columns.iter().map(|s| s.as_str()).collect();
    render_columns(table, &names, out)
}

/// Convenience wrapper returning the grid as a string.
pub fn render(table: &Table) -> String {
    let mut out = Vec::new();
    render_into(table, &mut out).expect("writing to a Vec cannot fail");
    String::from_utf8(out).expect("grid output is valid UTF-8")
}

fn render_columns(table: &Table, names: &[&str], out: &mut impl Write) -> io::Result<()> {
    if names.is_empty() {
        return writeln!(out, "(empty table)");
    }

    let columns: Vec<_> = names
        .iter()
        .filter_map(|name| table.column(name))
        .collect();

    // Column width is the widest of the header and every cell rendering.
    let widths: Vec<usize> = columns
        .iter()
        .map(|column| {
            column
                .cells
                .iter()
                .map(|cell| cell.to_string().chars().count())
                .chain(std::iter::once(column.name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    for (column, width) in columns.iter().zip(&widths) {
        write!(out, "| {:<width$} ", column.name, width = *width)?;
    }
    writeln!(out, "|")?;

    for width in &widths {
        write!(out, "|{:-<width$}", "", width = width + 2)?;
    }
    writeln!(out, "|")?;

    for row in 0..table.row_count() {
        for (column, width) in columns.iter().zip(&widths) {
            write!(out, "| {:<width$} ", column.cells[row].to_string(), width = *width)?;
        }
        writeln!(out, "|")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn sales_table() -> Table {
        Table::new(
            vec![
                "Product".to_string(),
                "Quantity".to_string(),
                "Sold".to_string(),
            ],
            vec![
                vec![text("A"), Cell::Number(10.0), Cell::Number(5.0)],
                vec![text("B"), Cell::Number(20.0), Cell::Number(15.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_generic_grid() {
        let grid = render(&sales_table());
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Product"));
        assert!(lines[0].contains("Quantity"));
        assert!(lines[2].contains("A"));
        assert!(lines[3].contains("20"));
    }

    #[test]
    fn test_sales_schema_matches() {
        let table = sales_table();
        assert!(DisplaySchema::sales().matches(&table));

        let mut out = Vec::new();
        render_schema_into(&table, &DisplaySchema::sales(), &mut out).unwrap();
        let grid = String::from_utf8(out).unwrap();
        assert!(grid.starts_with("| Product "));
    }

    #[test]
    fn test_schema_mismatch_falls_back_to_generic() {
        let table = Table::new(
            vec!["Item".to_string(), "Count".to_string()],
            vec![vec![text("A"), Cell::Number(1.0)]],
        )
        .unwrap();
        assert!(!DisplaySchema::sales().matches(&table));

        let mut out = Vec::new();
        render_schema_into(&table, &DisplaySchema::sales(), &mut out).unwrap();
        let grid = String::from_utf8(out).unwrap();
        assert!(grid.contains("Item"));
        assert!(grid.contains("Count"));
    }

    #[test]
    fn test_missing_cells_render_blank() {
        let table = Table::new(
            vec!["Product".to_string(), "Sold".to_string()],
            vec![vec![text("A"), Cell::Missing]],
        )
        .unwrap();
        let grid = render(&table);
        assert!(grid.lines().nth(2).unwrap().contains("| A "));
    }

    #[test]
    fn test_empty_table_renders_placeholder() {
        let table = Table::new(vec![], vec![]).unwrap();
        assert_eq!(render(&table), "(empty table)\n");
    }
}
