use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Result set of one statement: column names plus rows of nullable text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Single-row, single-column result, as returned by status-only commands.
    pub fn scalar(column: &str, value: impl Into<String>) -> Self {
        Self {
            columns: vec![column.to_string()],
            rows: vec![vec![Some(value.into())]],
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name`; exact match first, then ASCII case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|column| column.eq_ignore_ascii_case(name))
            })
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|values| values.get(column))
            .and_then(|value| value.as_deref())
    }

    /// Value of the named column in the given row.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        self.value(row, self.column_index(column)?)
    }

    /// First column of the first row.
    pub fn first_value(&self) -> Option<&str> {
        self.value(0, 0)
    }
}

/// Outcome of a single file upload reported by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Name of the file as recorded at the remote location.
    pub source: String,
    /// Status reported by the location (e.g. `UPLOADED`, `SKIPPED`).
    pub status: String,
}

/// Contract implemented by the warehouse session collaborator.
///
/// Every component borrows the same session and calls it sequentially.
#[async_trait]
pub trait CatalogSession: Send + Sync {
    /// Run a statement and return its rows.
    async fn execute(&self, statement: &str) -> Result<RowSet>;

    /// Run a command whose rows are not returned directly (`SHOW`, `DESC`)
    /// and return the result set it produced.
    async fn run_and_capture(&self, statement: &str) -> Result<RowSet>;

    /// Download every file under an external location into `dest`.
    async fn download(&self, location: &str, dest: &Path) -> Result<Vec<PathBuf>>;

    /// Upload one local file to an external location.
    async fn upload(&self, local: &Path, location: &str) -> Result<UploadOutcome>;

    /// Append rows to an existing table, returning the number of rows loaded.
    async fn bulk_load(&self, table: &str, data: &RowSet) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show_result() -> RowSet {
        let mut rows = RowSet::new(vec!["name".to_string(), "schema_name".to_string()]);
        rows.push_row(vec![Some("S1".to_string()), Some("PUBLIC".to_string())]);
        rows.push_row(vec![Some("S2".to_string()), None]);
        rows
    }

    #[test]
    fn looks_up_columns_by_name() {
        let rows = show_result();
        assert_eq!(rows.get(0, "name"), Some("S1"));
        assert_eq!(rows.get(1, "SCHEMA_NAME"), None);
        assert_eq!(rows.get(0, "missing"), None);
        assert_eq!(rows.first_value(), Some("S1"));
    }

    #[test]
    fn exact_column_match_wins() {
        let rows = RowSet::new(vec!["NAME".to_string(), "name".to_string()]);
        assert_eq!(rows.column_index("name"), Some(1));
        assert_eq!(rows.column_index("Name"), Some(0));
    }
}
