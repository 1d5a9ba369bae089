use crate::error::{CategorizerError, Result};
use log::warn;

/// Spreadsheet-shaped tabular data: one header row plus data rows of string
/// cells. This is the exchange format between the sheet store, the engine,
/// and reconciliation; rows shorter than the header are padded with blanks
/// on read so every cell access is total.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Builds a table from the `values` array of a spreadsheet API response,
    /// treating the first row as headers. An empty `values` yields an empty
    /// table with no headers. Rows wider than the header row can occur when
    /// trailing header cells are blank; the headers are padded to the widest
    /// row so no cell is dropped, since write-back replaces the full range.
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut iter = values.into_iter();
        let mut headers = iter.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = iter.collect();

        let width = rows.iter().map(Vec::len).fold(headers.len(), usize::max);
        if width > headers.len() {
            warn!(
                "Rows are wider than the header row ({} cells vs {} headers); padding headers to keep every cell",
                width,
                headers.len()
            );
            headers.resize(width, String::new());
        }

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Serializes back to the `[headers] + rows` shape the sheet API writes,
    /// with missing values already materialized as blank cells.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.headers.clone());
        values.extend(self.rows.iter().cloned());
        values
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Exact-match column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Case-insensitive column lookup, for conventionally-named columns like
    /// "Amount" whose capitalization varies across sheets.
    pub fn column_index_ignore_case(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Column lookup that fails with the range name for error reporting.
    pub fn require_column(&self, name: &str, range: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| CategorizerError::MissingColumn {
                column: name.to_string(),
                range: range.to_string(),
            })
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(|s| s.as_str())
    }

    /// Appends a column, filling existing rows with the provided values and
    /// padding with blanks if `values` is short.
    pub fn push_column(&mut self, header: impl Into<String>, values: Vec<String>) {
        self.headers.push(header.into());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().unwrap_or_default());
        }
    }
}
