//! CSV file reading into a string-typed DataFrame.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use polars::prelude::*;

use crate::error::{IngestError, Result};

/// A data row with more fields than the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaggedRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub fields: usize,
}

/// Record structure of a source file.
#[derive(Debug, Clone, Default)]
pub struct CsvLayout {
    pub header_fields: usize,
    /// Data records, ragged or not.
    pub rows: usize,
    pub ragged_rows: Vec<RaggedRow>,
}

fn parse_error(path: &Path, err: &csv::Error) -> IngestError {
    IngestError::CsvParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Scans every record for its field count. `None` when the file has no
/// header line.
pub fn scan_csv_layout(path: &Path) -> Result<Option<CsvLayout>> {
    let file = File::open(path).map_err(|source| IngestError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader.byte_headers().map_err(|e| parse_error(path, &e))?;
    if headers.iter().all(|cell| cell.trim_ascii().is_empty()) {
        return Ok(None);
    }
    let mut layout = CsvLayout {
        header_fields: headers.len(),
        ..CsvLayout::default()
    };

    for record in reader.byte_records() {
        let record = record.map_err(|e| parse_error(path, &e))?;
        layout.rows += 1;
        if record.len() > layout.header_fields {
            layout.ragged_rows.push(RaggedRow {
                row: layout.rows,
                fields: record.len(),
            });
        }
    }
    Ok(Some(layout))
}

/// Reads the whole file with every column typed as a string.
///
/// Coercion is left to the caller so that a bad cell rejects its row
/// instead of failing the file. Ragged rows are truncated to the header
/// width; [`scan_csv_layout`] reports them.
pub fn read_csv_table(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|options| options.with_truncate_ragged_lines(true))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(df)
}

/// Converts a cell to a trimmed string, `None` for null or blank cells.
pub fn any_to_string_non_empty(value: AnyValue<'_>) -> Option<String> {
    let text = match value {
        AnyValue::Null => return None,
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
