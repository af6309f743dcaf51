//! Source ICU encounter records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One ICU encounter as loaded from the source dataset.
///
/// Only type coercion has been applied; values are otherwise exactly what
/// the source contained. Empty source cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEncounter {
    /// 1-based data row number in the source file (header excluded).
    pub source_row: usize,
    pub patient_id: String,
    pub encounter_id: String,
    pub admit_time: NaiveDateTime,
    pub discharge_time: Option<NaiveDateTime>,
    pub age: Option<f64>,
    pub sex: Option<String>,
    pub care_unit: Option<String>,
    pub diagnosis_codes: Vec<String>,
    pub heart_rate: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub spo2: Option<f64>,
    pub temperature: Option<f64>,
    pub lactate: Option<f64>,
    pub creatinine: Option<f64>,
    /// Timestamp of the clinical event observations.
    pub event_time: Option<NaiveDateTime>,
    pub expired: bool,
}

impl RawEncounter {
    /// Minimal encounter with every optional field empty.
    pub fn new(
        patient_id: impl Into<String>,
        encounter_id: impl Into<String>,
        admit_time: NaiveDateTime,
    ) -> Self {
        Self {
            source_row: 0,
            patient_id: patient_id.into(),
            encounter_id: encounter_id.into(),
            admit_time,
            discharge_time: None,
            age: None,
            sex: None,
            care_unit: None,
            diagnosis_codes: Vec::new(),
            heart_rate: None,
            systolic_bp: None,
            spo2: None,
            temperature: None,
            lactate: None,
            creatinine: None,
            event_time: None,
            expired: false,
        }
    }

    /// Value of a numeric clinical field, if recorded.
    pub fn clinical_value(&self, field: ClinicalField) -> Option<f64> {
        match field {
            ClinicalField::HeartRate => self.heart_rate,
            ClinicalField::SystolicBp => self.systolic_bp,
            ClinicalField::Spo2 => self.spo2,
            ClinicalField::Temperature => self.temperature,
            ClinicalField::Lactate => self.lactate,
            ClinicalField::Creatinine => self.creatinine,
        }
    }

    pub const REQUIRED_FIELDS: usize = 6;

    /// Required fields that are populated, out of [`RawEncounter::REQUIRED_FIELDS`].
    pub fn fields_present(&self) -> usize {
        // ids and admit time are guaranteed by the loader
        3 + usize::from(self.age.is_some())
            + usize::from(self.sex.is_some())
            + usize::from(self.care_unit.is_some())
    }

    /// Natural ordering key used to pick a patient's enrollment encounter.
    pub fn chronology_key(&self) -> (NaiveDateTime, &str) {
        (self.admit_time, self.encounter_id.as_str())
    }
}

/// Numeric clinical fields that trigger rules can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalField {
    /// Beats per minute.
    HeartRate,
    /// mmHg.
    SystolicBp,
    /// Percent saturation.
    Spo2,
    /// Degrees Celsius.
    Temperature,
    /// mmol/L.
    Lactate,
    /// mg/dL.
    Creatinine,
}

impl ClinicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalField::HeartRate => "heart_rate",
            ClinicalField::SystolicBp => "systolic_bp",
            ClinicalField::Spo2 => "spo2",
            ClinicalField::Temperature => "temperature",
            ClinicalField::Lactate => "lactate",
            ClinicalField::Creatinine => "creatinine",
        }
    }
}

impl fmt::Display for ClinicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
