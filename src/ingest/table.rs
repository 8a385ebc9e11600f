//! Raw tabular input as handed over by the upload boundary.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// One cell of a raw table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// The cell's native numeric value, if it is a number cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// The cell rendered as text (numbers in shortest form).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(v) => Some(format!("{v}")),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// A named, columnar table of raw cells.
///
/// Ownership is transient: a table is built per analysis request and
/// discarded once aggregation has consumed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    /// Source unit name (e.g. a sheet name), if the source had one.
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table, validating that every row matches the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for row in &rows {
            if row.len() != columns.len() {
                return Err(AnalysisError::InvalidParameter(format!(
                    "row width {} does not match {} columns",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self {
            name: None,
            columns,
            rows,
        })
    }

    /// Attach a source unit name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of a named column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| AnalysisError::ColumnNotFound(name.to_string()))?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }
}
