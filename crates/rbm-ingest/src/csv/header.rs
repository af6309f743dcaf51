//! Source header column resolution.

use polars::prelude::DataFrame;
use rbm_model::SourceSchema;

/// Trimmed header cells of the source file, in file order.
#[derive(Debug, Clone)]
pub struct CsvHeaders {
    pub columns: Vec<String>,
}

impl CsvHeaders {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Column names of a frame read by [`super::read_csv_table`], trimmed and
    /// without a byte-order mark.
    pub fn from_frame(df: &DataFrame) -> Self {
        let columns = df
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str().trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Self::new(columns)
    }

    /// Position of a column by exact (trimmed) name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name.trim())
    }

    /// Required schema columns not present in the header.
    pub fn missing_required(&self, schema: &SourceSchema) -> Vec<String> {
        schema
            .required_columns()
            .into_iter()
            .filter(|column| self.position(column).is_none())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_headers_from_frame_are_trimmed() {
        let df = df!(
            " subject_id" => ["1"],
            "hadm_id " => ["2"],
        )
        .unwrap();
        let headers = CsvHeaders::from_frame(&df);
        assert_eq!(headers.columns, vec!["subject_id", "hadm_id"]);
    }

    #[test]
    fn test_missing_required_columns() {
        let headers = CsvHeaders::new(
            ["subject_id", "hadm_id", "admittime", "age", "first_careunit"]
                .map(str::to_string)
                .to_vec(),
        );
        let missing = headers.missing_required(&SourceSchema::default());
        assert_eq!(missing, vec!["gender"]);
        assert_eq!(headers.position(" age "), Some(3));
    }
}
