//! Loading the source encounter file into [`RawEncounter`]s.

use std::collections::BTreeMap;
use std::path::Path;

use polars::prelude::*;
use rbm_model::{
    FindingCategory, FindingOutcome, RawEncounter, RecordType, SourceSchema, ValidationFinding,
};
use tracing::{debug, info, warn};

use crate::coerce::{parse_flag, parse_number, parse_timestamp, split_codes};
use crate::csv::{CsvHeaders, any_to_string_non_empty, read_csv_table, scan_csv_layout};
use crate::error::{IngestError, Result};

/// Rule id of loader findings.
pub const LOAD_RULE_ID: &str = "LOAD001";

/// A source cell that could not be coerced, a missing key cell, or a row
/// with more fields than the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFinding {
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// Empty for row-level problems.
    pub column: String,
    pub value: String,
    pub message: String,
}

impl LoadFinding {
    fn ragged(row: usize, fields: usize, header_fields: usize) -> Self {
        Self {
            row,
            column: String::new(),
            value: String::new(),
            message: format!("row has {fields} fields, header has {header_fields}"),
        }
    }

    /// Identifier of the rejected row as used in findings.
    pub fn record_id(&self) -> String {
        format!("row:{}", self.row)
    }

    pub fn to_finding(&self) -> ValidationFinding {
        ValidationFinding::new(
            LOAD_RULE_ID,
            FindingCategory::Load,
            RecordType::Encounter,
            self.record_id(),
            FindingOutcome::Fail,
            match (self.column.is_empty(), self.value.is_empty()) {
                (true, _) => self.message.clone(),
                (false, true) => format!("column {}: {}", self.column, self.message),
                (false, false) => {
                    format!("column {}: {} ({:?})", self.column, self.message, self.value)
                }
            },
        )
    }
}

/// Output of the loader.
#[derive(Debug, Clone, Default)]
pub struct LoadedSource {
    pub encounters: Vec<RawEncounter>,
    pub findings: Vec<LoadFinding>,
    /// Data rows in the file, accepted or not.
    pub rows_read: usize,
}

impl LoadedSource {
    /// Number of distinct rows rejected.
    pub fn rows_rejected(&self) -> usize {
        self.rows_read - self.encounters.len()
    }

    pub fn validation_findings(&self) -> Vec<ValidationFinding> {
        self.findings.iter().map(LoadFinding::to_finding).collect()
    }
}

/// Column positions for each logical field; optional fields may be absent.
struct ColumnMap {
    patient_id: usize,
    encounter_id: usize,
    admit_time: usize,
    age: usize,
    sex: usize,
    care_unit: usize,
    discharge_time: Option<usize>,
    diagnosis_codes: Option<usize>,
    heart_rate: Option<usize>,
    systolic_bp: Option<usize>,
    spo2: Option<usize>,
    temperature: Option<usize>,
    lactate: Option<usize>,
    creatinine: Option<usize>,
    event_time: Option<usize>,
    expire_flag: Option<usize>,
}

impl ColumnMap {
    fn resolve(path: &Path, headers: &CsvHeaders, schema: &SourceSchema) -> Result<Self> {
        let missing = headers.missing_required(schema);
        let required = |name: &str| headers.position(name);
        match (
            required(&schema.patient_id),
            required(&schema.encounter_id),
            required(&schema.admit_time),
            required(&schema.age),
            required(&schema.sex),
            required(&schema.care_unit),
        ) {
            (
                Some(patient_id),
                Some(encounter_id),
                Some(admit_time),
                Some(age),
                Some(sex),
                Some(care_unit),
            ) => Ok(Self {
                patient_id,
                encounter_id,
                admit_time,
                age,
                sex,
                care_unit,
                discharge_time: headers.position(&schema.discharge_time),
                diagnosis_codes: headers.position(&schema.diagnosis_codes),
                heart_rate: headers.position(&schema.heart_rate),
                systolic_bp: headers.position(&schema.systolic_bp),
                spo2: headers.position(&schema.spo2),
                temperature: headers.position(&schema.temperature),
                lactate: headers.position(&schema.lactate),
                creatinine: headers.position(&schema.creatinine),
                event_time: headers.position(&schema.event_time),
                expire_flag: headers.position(&schema.expire_flag),
            }),
            _ => Err(IngestError::SchemaMismatch {
                path: path.to_path_buf(),
                missing,
            }),
        }
    }
}

/// Reads cells of one row and records coercion failures.
struct RowReader<'a> {
    columns: &'a [Column],
    headers: &'a CsvHeaders,
    idx: usize,
    findings: Vec<LoadFinding>,
}

impl<'a> RowReader<'a> {
    fn text(&self, position: Option<usize>) -> Option<String> {
        let column = self.columns.get(position?)?;
        any_to_string_non_empty(column.get(self.idx).unwrap_or(AnyValue::Null))
    }

    fn reject(&mut self, position: usize, value: &str, message: &str) {
        self.findings.push(LoadFinding {
            row: self.idx + 1,
            column: self
                .headers
                .columns
                .get(position)
                .cloned()
                .unwrap_or_default(),
            value: value.to_string(),
            message: message.to_string(),
        });
    }

    fn required_text(&mut self, position: usize) -> Option<String> {
        let value = self.text(Some(position));
        if value.is_none() {
            self.reject(position, "", "required value is empty");
        }
        value
    }

    fn coerce<T>(
        &mut self,
        position: Option<usize>,
        parse: fn(&str) -> Option<T>,
        expected: &str,
    ) -> Option<T> {
        let raw = self.text(position)?;
        let parsed = parse(&raw);
        if parsed.is_none()
            && let Some(position) = position
        {
            self.reject(position, &raw, &format!("cannot parse as {expected}"));
        }
        parsed
    }
}

fn read_row(
    columns: &[Column],
    headers: &CsvHeaders,
    map: &ColumnMap,
    idx: usize,
) -> std::result::Result<RawEncounter, Vec<LoadFinding>> {
    let mut row = RowReader {
        columns,
        headers,
        idx,
        findings: Vec::new(),
    };

    let patient_id = row.required_text(map.patient_id);
    let encounter_id = row.required_text(map.encounter_id);
    let admit_time = match row.required_text(map.admit_time) {
        Some(raw) => {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                row.reject(map.admit_time, &raw, "cannot parse as timestamp");
            }
            parsed
        }
        None => None,
    };
    let discharge_time = row.coerce(map.discharge_time, parse_timestamp, "timestamp");
    let event_time = row.coerce(map.event_time, parse_timestamp, "timestamp");
    let age = row.coerce(Some(map.age), parse_number, "number");
    let heart_rate = row.coerce(map.heart_rate, parse_number, "number");
    let systolic_bp = row.coerce(map.systolic_bp, parse_number, "number");
    let spo2 = row.coerce(map.spo2, parse_number, "number");
    let temperature = row.coerce(map.temperature, parse_number, "number");
    let lactate = row.coerce(map.lactate, parse_number, "number");
    let creatinine = row.coerce(map.creatinine, parse_number, "number");
    let expired = row.coerce(map.expire_flag, parse_flag, "flag");
    let sex = row.text(Some(map.sex));
    let care_unit = row.text(Some(map.care_unit));
    let diagnosis_codes = row
        .text(map.diagnosis_codes)
        .map(|raw| split_codes(&raw))
        .unwrap_or_default();

    match (patient_id, encounter_id, admit_time) {
        (Some(patient_id), Some(encounter_id), Some(admit_time)) if row.findings.is_empty() => {
            Ok(RawEncounter {
                source_row: idx + 1,
                patient_id,
                encounter_id,
                admit_time,
                discharge_time,
                age,
                sex,
                care_unit,
                diagnosis_codes,
                heart_rate,
                systolic_bp,
                spo2,
                temperature,
                lactate,
                creatinine,
                event_time,
                expired: expired.unwrap_or(false),
            })
        }
        _ => Err(row.findings),
    }
}

/// Load every encounter row of the source file.
///
/// Fails with [`IngestError::SourceUnavailable`] when the file cannot be
/// read and [`IngestError::SchemaMismatch`] when required columns are
/// missing. Rows that cannot be coerced, or that carry more fields than the
/// header, are rejected with findings.
pub fn load_encounters(path: &Path, schema: &SourceSchema) -> Result<LoadedSource> {
    let layout = scan_csv_layout(path)?.ok_or_else(|| IngestError::SchemaMismatch {
        path: path.to_path_buf(),
        missing: schema
            .required_columns()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })?;
    let df = read_csv_table(path)?;
    let headers = CsvHeaders::from_frame(&df);
    let map = ColumnMap::resolve(path, &headers, schema)?;
    let columns = df.get_columns();
    if layout.rows != df.height() {
        warn!(
            scanned = layout.rows,
            parsed = df.height(),
            "record count differs between scan and parse"
        );
    }
    let ragged: BTreeMap<usize, usize> = layout
        .ragged_rows
        .iter()
        .map(|ragged| (ragged.row, ragged.fields))
        .collect();

    let mut loaded = LoadedSource {
        rows_read: df.height(),
        ..LoadedSource::default()
    };
    for idx in 0..df.height() {
        let row = match ragged.get(&(idx + 1)) {
            Some(&fields) => Err(vec![LoadFinding::ragged(idx + 1, fields, layout.header_fields)]),
            None => read_row(columns, &headers, &map, idx),
        };
        match row {
            Ok(encounter) => loaded.encounters.push(encounter),
            Err(findings) => {
                warn!(row = idx + 1, problems = findings.len(), "rejected source row");
                for finding in &findings {
                    debug!(
                        row = finding.row,
                        column = %finding.column,
                        problem = %finding.message,
                        "load finding"
                    );
                }
                loaded.findings.extend(findings);
            }
        }
    }

    info!(
        path = %path.display(),
        rows = loaded.rows_read,
        accepted = loaded.encounters.len(),
        rejected = loaded.rows_rejected(),
        "loaded source encounters"
    );
    Ok(loaded)
}
