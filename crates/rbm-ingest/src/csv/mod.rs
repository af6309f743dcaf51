//! CSV reading utilities.

mod header;
mod reader;

pub use header::CsvHeaders;
pub use reader::{CsvLayout, RaggedRow, any_to_string_non_empty, read_csv_table, scan_csv_layout};
