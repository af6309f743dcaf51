//! Table names and CSV encoding.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StoreError};

/// The persisted tables, in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Subjects,
    AdverseEvents,
    ValidationFindings,
    SiteMetrics,
    SafetyMetrics,
    QualityMetrics,
    Demographics,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Subjects,
        Table::AdverseEvents,
        Table::ValidationFindings,
        Table::SiteMetrics,
        Table::SafetyMetrics,
        Table::QualityMetrics,
        Table::Demographics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Subjects => "subjects",
            Table::AdverseEvents => "adverse_events",
            Table::ValidationFindings => "validation_findings",
            Table::SiteMetrics => "site_metrics",
            Table::SafetyMetrics => "safety_metrics",
            Table::QualityMetrics => "quality_metrics",
            Table::Demographics => "dm",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode rows as CSV with a header line.
///
/// An empty table still gets its header so readers see the columns.
pub fn encode<T: Serialize>(table: Table, rows: &[T], header: &[&str]) -> Result<Vec<u8>> {
    let csv_err = |source| StoreError::Csv {
        operation: "encode",
        table: table.as_str(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!rows.is_empty())
        .from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(header).map_err(csv_err)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.into_inner().map_err(|e| StoreError::Csv {
        operation: "encode",
        table: table.as_str(),
        source: e.into_error().into(),
    })
}

/// Decode CSV bytes into rows.
pub fn decode<T: DeserializeOwned>(table: Table, bytes: &[u8]) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|source| StoreError::Csv {
            operation: "decode",
            table: table.as_str(),
            source,
        })
}

pub const SUBJECT_COLUMNS: &[&str] = &[
    "subject_id",
    "patient_id",
    "site_id",
    "enrollment_date",
    "age",
    "age_band",
    "sex",
    "status",
    "encounter_count",
    "validity",
];

pub const ADVERSE_EVENT_COLUMNS: &[&str] = &[
    "event_id",
    "subject_id",
    "encounter_id",
    "trigger_id",
    "term",
    "onset_date",
    "severity",
    "severity_code",
    "related",
    "site_id",
    "resolution",
    "validity",
];

pub const FINDING_COLUMNS: &[&str] = &[
    "rule_id",
    "category",
    "record_type",
    "record_id",
    "outcome",
    "message",
];

pub const SITE_METRIC_COLUMNS: &[&str] = &[
    "site_id",
    "enrolled",
    "submitted",
    "target",
    "enrollment_rate",
    "ae_count",
    "mean_age",
    "first_enrollment",
    "last_enrollment",
];

pub const SAFETY_METRIC_COLUMNS: &[&str] = &[
    "site_id",
    "severity",
    "period",
    "event_count",
    "subjects_with_event",
    "rate_per_100",
];

pub const QUALITY_METRIC_COLUMNS: &[&str] = &[
    "record_type",
    "total",
    "valid",
    "warning",
    "invalid",
    "excluded",
    "completeness_pct",
    "compliance_pct",
];

/// SDTM DM variables.
pub const DEMOGRAPHICS_COLUMNS: &[&str] = &[
    "STUDYID", "DOMAIN", "USUBJID", "SUBJID", "SITEID", "RFSTDTC", "AGE", "AGEU", "SEX", "ARMCD",
    "ARM",
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rbm_model::{DemographicsRecord, Subject, SubjectStatus, Validity};

    #[test]
    fn empty_table_keeps_header() {
        let bytes = encode::<Subject>(Table::Subjects, &[], SUBJECT_COLUMNS).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("subject_id,patient_id,site_id"));
        let rows: Vec<Subject> = decode(Table::Subjects, text.as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn optional_fields_survive_csv() {
        let subject = Subject {
            subject_id: "ICU-RBM-0001".to_string(),
            patient_id: "1".to_string(),
            site_id: "SITE-01".to_string(),
            enrollment_date: NaiveDate::from_ymd_opt(2150, 1, 1).unwrap(),
            age: None,
            age_band: None,
            sex: Some("F".to_string()),
            status: SubjectStatus::Enrolled,
            encounter_count: 1,
            validity: Validity::Invalid,
        };
        let bytes = encode(Table::Subjects, std::slice::from_ref(&subject), SUBJECT_COLUMNS).unwrap();
        let header = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(header.lines().next(), Some(SUBJECT_COLUMNS.join(",").as_str()));
        let rows: Vec<Subject> = decode(Table::Subjects, &bytes).unwrap();
        assert_eq!(rows, vec![subject]);
    }

    #[test]
    fn demographics_header_uses_variable_names() {
        let record = DemographicsRecord {
            studyid: "ICU-RBM".to_string(),
            domain: "DM".to_string(),
            usubjid: "ICU-RBM-0001".to_string(),
            subjid: "1".to_string(),
            siteid: "SITE-01".to_string(),
            rfstdtc: NaiveDate::from_ymd_opt(2150, 1, 1).unwrap(),
            age: None,
            ageu: None,
            sex: Some("M".to_string()),
            armcd: "CONTROL".to_string(),
            arm: "Control".to_string(),
        };
        let bytes = encode(
            Table::Demographics,
            std::slice::from_ref(&record),
            DEMOGRAPHICS_COLUMNS,
        )
        .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(DEMOGRAPHICS_COLUMNS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("ICU-RBM,DM,ICU-RBM-0001,1,SITE-01,2150-01-01,,,M,CONTROL,Control")
        );
        let rows: Vec<DemographicsRecord> = decode(Table::Demographics, text.as_bytes()).unwrap();
        assert_eq!(rows, vec![record]);
    }
}
