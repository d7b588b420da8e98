use std::collections::BTreeMap;
use std::path::Path;

use crate::classify::classify;
use crate::error::DataError;
use crate::loader;
use crate::plan::{self, SeriesPlan};
use crate::summary::{summarize, SummaryRecord};
use crate::table::Table;

/// Exclusive owner of the current table.
///
/// There is exactly one table in flight at a time: a successful load
/// atomically replaces the previous one, a failed load leaves it untouched,
/// and readers borrow it immutably. Replacement needs `&mut self`, so the
/// borrow checker enforces the single-writer discipline instead of a lock.
#[derive(Debug, Default)]
pub struct Session {
    username: Option<String>,
    table: Option<Table>,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    /// A session for the user the login surface authenticated. Only the
    /// name crosses the boundary; the credential check itself lives outside
    /// the core.
    pub fn for_user(username: impl Into<String>) -> Session {
        Session {
            username: Some(username.into()),
            table: None,
        }
    }

    pub fn greeting(&self) -> Option<String> {
        self.username.as_ref().map(|name| format!("Welcome, {}", name))
    }

    /// Load a file and take ownership of the resulting table. On failure
    /// the previously loaded table, if any, stays current.
    pub fn load_file(&mut self, path: &Path) -> Result<&Table, DataError> {
        let table = loader::load(path)?;
        log::info!(
            "file loaded: {} ({} columns, {} rows)",
            path.display(),
            table.column_count(),
            table.row_count()
        );
        self.table = Some(table);
        Ok(self.table.as_ref().expect("table was just stored"))
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Classify and summarize the current table, logging each record the
    /// way the original reported its analysis.
    pub fn analyze(&self) -> Result<BTreeMap<String, SummaryRecord>, DataError> {
        let table = self.table.as_ref().ok_or(DataError::EmptyDataset)?;
        let records = summarize(table, &classify(table))?;

        if records.is_empty() {
            log::info!("no numerical columns found in the loaded data");
        }
        for (column, record) in &records {
            log::info!("Maximum {}: {}", column, record.max);
            log::info!("Minimum {}: {}", column, record.min);
        }
        Ok(records)
    }

    /// Plan the chart for the current table against `label`.
    pub fn plan(&self, label: &str) -> Result<SeriesPlan, DataError> {
        let table = self.table.as_ref().ok_or(DataError::EmptyDataset)?;
        plan::plan(table, label)
    }
}
