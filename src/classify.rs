use std::collections::BTreeMap;

use crate::table::{Cell, Table};

/// Per-column numeric classification, computed once per table and shared by
/// the analyzer and the planner so the two never disagree about a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    numeric: BTreeMap<String, bool>,
}

impl Classification {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.get(column).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.numeric.iter().map(|(name, flag)| (name.as_str(), *flag))
    }
}

/// Classify every column of the table. A column is numeric iff every
/// non-missing cell coerces to a number; missing cells are skipped rather
/// than counted as failures, so a zero-row or all-missing column is
/// vacuously numeric.
pub fn classify(table: &Table) -> Classification {
    let numeric = table
        .columns()
        .iter()
        .map(|column| (column.name.clone(), column_is_numeric(&column.cells)))
        .collect();
    Classification { numeric }
}

fn column_is_numeric(cells: &[Cell]) -> bool {
    cells
        .iter()
        .filter(|cell| !cell.is_missing())
        .all(|cell| cell.as_number().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> Table {
        Table::new(
            vec![
                "Product".to_string(),
                "Quantity".to_string(),
                "Region".to_string(),
            ],
            vec![
                vec![
                    Cell::Text("A".to_string()),
                    Cell::Number(10.0),
                    Cell::Text("North".to_string()),
                ],
                vec![
                    Cell::Text("B".to_string()),
                    Cell::Number(20.0),
                    Cell::Text("South".to_string()),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_classify_mixed_columns() {
        let table = make_table();
        let classes = classify(&table);
        assert!(!classes.is_numeric("Product"));
        assert!(classes.is_numeric("Quantity"));
        assert!(!classes.is_numeric("Region"));
        assert!(!classes.is_numeric("NoSuchColumn"));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let table = make_table();
        assert_eq!(classify(&table), classify(&table));
    }

    #[test]
    fn test_missing_cells_are_numeric_compatible() {
        let table = Table::new(
            vec!["v".to_string()],
            vec![
                vec![Cell::Number(1.0)],
                vec![Cell::Missing],
                vec![Cell::Number(3.0)],
            ],
        )
        .unwrap();
        assert!(classify(&table).is_numeric("v"));
    }

    #[test]
    fn test_all_missing_column_is_numeric() {
        let table = Table::new(
            vec!["v".to_string()],
            vec![vec![Cell::Missing], vec![Cell::Missing]],
        )
        .unwrap();
        assert!(classify(&table).is_numeric("v"));
    }

    #[test]
    fn test_zero_row_column_is_numeric() {
        let table = Table::new(vec!["v".to_string()], vec![]).unwrap();
        assert!(classify(&table).is_numeric("v"));
    }

    #[test]
    fn test_string_typed_digits_still_coerce() {
        let table = Table::new(
            vec!["v".to_string()],
            vec![
                vec![Cell::Text("12".to_string())],
                vec![Cell::Number(3.0)],
            ],
        )
        .unwrap();
        assert!(classify(&table).is_numeric("v"));
    }
}
