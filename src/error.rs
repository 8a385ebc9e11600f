//! Error types for the salescope analysis engine.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while preparing or running an analysis.
///
/// Per-row coercion problems are not errors: unparseable rows are dropped
/// and surfaced as counts. Only dataset-level unrecoverable conditions
/// reach the caller through this type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Input table has no rows.
    #[error("empty input table")]
    EmptyInput,

    /// A selected column does not exist in the table.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Coercion dropped every row (no parseable date/value pairs remain).
    #[error("no valid rows after coercion: {dropped_dates} unparseable dates, {dropped_values} unparseable values")]
    NoValidRows {
        dropped_dates: usize,
        dropped_values: usize,
    },

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    Computation(String),
}
