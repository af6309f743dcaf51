//! ICU encounter record loading.
//!
//! Reads the source CSV into a string-typed Polars DataFrame, resolves the
//! configured column schema and coerces each row into a
//! [`rbm_model::RawEncounter`]. Rows that cannot be coerced are rejected
//! with [`LoadFinding`]s; only a missing file or a header without the
//! required columns is fatal.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use rbm_ingest::load_encounters;
//! use rbm_model::SourceSchema;
//!
//! let loaded = load_encounters(Path::new("data/icu_encounters.csv"), &SourceSchema::default())?;
//! println!("{} encounters, {} rejected", loaded.encounters.len(), loaded.rows_rejected());
//! ```

mod coerce;
mod csv;
mod error;
mod loader;

// === Error Types ===
pub use error::{IngestError, Result};

// === CSV Reading ===
pub use self::csv::{CsvHeaders, CsvLayout, RaggedRow, read_csv_table, scan_csv_layout};

// === Coercion ===
pub use coerce::{parse_flag, parse_number, parse_timestamp, split_codes};

// === Loading ===
pub use loader::{LOAD_RULE_ID, LoadFinding, LoadedSource, load_encounters};
