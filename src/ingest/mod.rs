//! Raw table ingestion: the table model, tolerant coercion, and the
//! advisory column classifier.

mod classify;
mod coerce;
mod table;

pub use classify::{classify_columns, ColumnReport, Recommendation, ValueColumnProfile};
pub use coerce::{parse_date, parse_date_str, parse_value, parse_value_lenient, parse_value_str};
pub use table::{Cell, RawTable};
