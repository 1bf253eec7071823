//! Dataset text handling: parsing, acceptance rules, and column statistics.

pub mod dsv;
pub mod stats;
pub mod validate;

pub use dsv::{parse, quote_cell, serialize, Dataset};
pub use stats::{column_stats, ColumnStats};
pub use validate::{validate, validate_dataset, DatasetError};
