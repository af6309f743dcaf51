pub mod adverse_event;
pub mod config;
pub mod demographics;
pub mod encounter;
pub mod enums;
pub mod error;
pub mod finding;
pub mod metrics;
pub mod subject;

pub use adverse_event::AdverseEvent;
pub use config::{
    ConfigError, PipelineConfig, SourceSchema, StoreOptions, TriggerPredicate, TriggerRule,
    ValidationOptions,
};
pub use demographics::{AGE_UNIT_YEARS, DM_DOMAIN, DemographicsRecord, arm_code};
pub use encounter::{ClinicalField, RawEncounter};
pub use enums::{
    FindingCategory, FindingOutcome, RecordType, ResolutionStatus, Severity, SubjectStatus,
    Validity,
};
pub use error::{ModelError, Result};
pub use finding::{FindingReport, ValidationFinding};
pub use metrics::{ALL_PERIODS, MetricTables, QualityMetric, SafetyMetric, SiteMetric};
pub use subject::{AgeBand, Subject};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn subject_serializes_flat() {
        let subject = Subject {
            subject_id: "ICU-RBM-0042".to_string(),
            patient_id: "42".to_string(),
            site_id: "SITE-01".to_string(),
            enrollment_date: NaiveDate::from_ymd_opt(2150, 3, 1).unwrap(),
            age: Some(47.0),
            age_band: AgeBand::for_age(47.0, 10),
            sex: Some("F".to_string()),
            status: SubjectStatus::Completed,
            encounter_count: 2,
            validity: Validity::Valid,
        };
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json["age_band"], "40-49");
        assert_eq!(json["status"], "completed");
        let round: Subject = serde_json::from_value(json).unwrap();
        assert_eq!(round, subject);
    }

    #[test]
    fn adverse_event_helpers() {
        let event = AdverseEvent {
            event_id: AdverseEvent::event_id_for("100001", "T01"),
            subject_id: "ICU-RBM-0042".to_string(),
            encounter_id: "100001".to_string(),
            trigger_id: "T01".to_string(),
            term: "Tachycardia".to_string(),
            onset_date: NaiveDate::from_ymd_opt(2150, 3, 2),
            severity: None,
            severity_code: "grade-9".to_string(),
            related: false,
            site_id: "SITE-01".to_string(),
            resolution: ResolutionStatus::Ongoing,
            validity: Validity::Invalid,
        };
        assert_eq!(event.event_id, "AE-100001-T01");
        assert_eq!(event.fields_present(), 4);
        assert_eq!(event.onset_period().as_deref(), Some("2150-03"));
    }
}
