use std::collections::BTreeMap;

use chrono::NaiveDate;
use proptest::prelude::*;
use rbm_metrics::{AggregateInput, aggregate};
use rbm_model::{
    ALL_PERIODS, AdverseEvent, MetricTables, RecordType, ResolutionStatus, Severity, Subject,
    SubjectStatus, Validity,
};
use serde::Serialize;

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2150, month, day).unwrap()
}

fn subject(id: &str, site: &str, age: Option<f64>, enrolled: NaiveDate, validity: Validity) -> Subject {
    Subject {
        subject_id: id.to_string(),
        patient_id: id.to_string(),
        site_id: site.to_string(),
        enrollment_date: enrolled,
        age,
        age_band: None,
        sex: Some("M".to_string()),
        status: SubjectStatus::Enrolled,
        encounter_count: 1,
        validity,
    }
}

fn event(id: &str, subject_id: &str, severity: Severity, onset: NaiveDate, validity: Validity) -> AdverseEvent {
    AdverseEvent {
        event_id: id.to_string(),
        subject_id: subject_id.to_string(),
        encounter_id: "1".to_string(),
        trigger_id: "T01".to_string(),
        term: "Term".to_string(),
        onset_date: Some(onset),
        severity: Some(severity),
        severity_code: severity.as_str().to_string(),
        related: false,
        site_id: "SITE-01".to_string(),
        resolution: ResolutionStatus::Ongoing,
        validity,
    }
}

struct Fixture {
    targets: BTreeMap<String, u32>,
    subjects: Vec<Subject>,
    events: Vec<AdverseEvent>,
}

fn fixture() -> Fixture {
    Fixture {
        targets: BTreeMap::from([("SITE-01".to_string(), 3), ("SITE-02".to_string(), 2)]),
        subjects: vec![
            subject("S-1", "SITE-01", Some(50.0), date(1, 5), Validity::Valid),
            subject("S-2", "SITE-01", Some(61.0), date(2, 10), Validity::Warning),
            subject("S-3", "SITE-01", None, date(1, 1), Validity::Invalid),
        ],
        events: vec![
            event("E1", "S-1", Severity::Severe, date(1, 6), Validity::Valid),
            event("E2", "S-1", Severity::Severe, date(2, 1), Validity::Valid),
            event("E3", "S-2", Severity::Mild, date(2, 11), Validity::Valid),
            event("E4", "S-2", Severity::Mild, date(2, 9), Validity::Invalid),
        ],
    }
}

fn run(fixture: &Fixture) -> MetricTables {
    aggregate(&AggregateInput {
        targets: &fixture.targets,
        encounters: &[],
        rows_rejected: 1,
        excluded_encounters: 2,
        subjects: &fixture.subjects,
        adverse_events: &fixture.events,
        unassigned_patients: 1,
    })
}

#[derive(Serialize)]
struct SiteRow {
    site_id: String,
    enrolled: usize,
    submitted: usize,
    target: u32,
    enrollment_rate: String,
    ae_count: usize,
    mean_age: Option<String>,
    first_enrollment: Option<NaiveDate>,
    last_enrollment: Option<NaiveDate>,
}

#[derive(Serialize)]
struct QualityRow {
    record_type: RecordType,
    total: usize,
    valid: usize,
    warning: usize,
    invalid: usize,
    excluded: usize,
    completeness_pct: String,
    compliance_pct: String,
}

#[test]
fn site_metrics_snapshot() {
    let tables = run(&fixture());
    let rows: Vec<SiteRow> = tables
        .site_metrics
        .iter()
        .map(|m| SiteRow {
            site_id: m.site_id.clone(),
            enrolled: m.enrolled,
            submitted: m.submitted,
            target: m.target,
            enrollment_rate: format!("{:.4}", m.enrollment_rate),
            ae_count: m.ae_count,
            mean_age: m.mean_age.map(|age| format!("{age:.2}")),
            first_enrollment: m.first_enrollment,
            last_enrollment: m.last_enrollment,
        })
        .collect();

    insta::assert_json_snapshot!(rows, @r#"
    [
      {
        "site_id": "SITE-01",
        "enrolled": 2,
        "submitted": 3,
        "target": 3,
        "enrollment_rate": "0.6667",
        "ae_count": 3,
        "mean_age": "55.50",
        "first_enrollment": "2150-01-05",
        "last_enrollment": "2150-02-10"
      },
      {
        "site_id": "SITE-02",
        "enrolled": 0,
        "submitted": 0,
        "target": 2,
        "enrollment_rate": "0.0000",
        "ae_count": 0,
        "mean_age": null,
        "first_enrollment": null,
        "last_enrollment": null
      }
    ]
    "#);
}

#[test]
fn quality_metrics_snapshot() {
    let tables = run(&fixture());
    let rows: Vec<QualityRow> = tables
        .quality_metrics
        .iter()
        .map(|m| QualityRow {
            record_type: m.record_type,
            total: m.total,
            valid: m.valid,
            warning: m.warning,
            invalid: m.invalid,
            excluded: m.excluded,
            completeness_pct: format!("{:.2}", m.completeness_pct),
            compliance_pct: format!("{:.2}", m.compliance_pct),
        })
        .collect();

    insta::assert_json_snapshot!(rows, @r#"
    [
      {
        "record_type": "encounter",
        "total": 1,
        "valid": 0,
        "warning": 0,
        "invalid": 1,
        "excluded": 2,
        "completeness_pct": "0.00",
        "compliance_pct": "0.00"
      },
      {
        "record_type": "subject",
        "total": 3,
        "valid": 1,
        "warning": 1,
        "invalid": 1,
        "excluded": 1,
        "completeness_pct": "93.33",
        "compliance_pct": "66.67"
      },
      {
        "record_type": "adverse_event",
        "total": 4,
        "valid": 3,
        "warning": 0,
        "invalid": 1,
        "excluded": 0,
        "completeness_pct": "100.00",
        "compliance_pct": "75.00"
      }
    ]
    "#);
}

#[test]
fn safety_grid_counts_only_valid_events() {
    let tables = run(&fixture());
    // 2 sites x 4 severities, then 3 monthly groups
    let all_time = tables
        .safety_metrics
        .iter()
        .filter(|m| m.period == ALL_PERIODS)
        .count();
    assert_eq!(all_time, 8);
    assert_eq!(tables.safety_metrics.len(), 11);

    let severe = tables.safety("SITE-01", Severity::Severe).unwrap();
    assert_eq!(severe.event_count, 2);
    assert_eq!(severe.subjects_with_event, 1);
    assert_eq!(severe.rate_per_100, 100.0);

    // the invalid mild event is excluded
    let mild = tables.safety("SITE-01", Severity::Mild).unwrap();
    assert_eq!(mild.event_count, 1);
    assert_eq!(mild.rate_per_100, 50.0);

    let monthly: Vec<(&str, Severity, &str)> = tables
        .safety_metrics
        .iter()
        .filter(|m| m.period != ALL_PERIODS)
        .map(|m| (m.site_id.as_str(), m.severity, m.period.as_str()))
        .collect();
    assert_eq!(
        monthly,
        vec![
            ("SITE-01", Severity::Mild, "2150-02"),
            ("SITE-01", Severity::Severe, "2150-01"),
            ("SITE-01", Severity::Severe, "2150-02"),
        ]
    );
}

#[test]
fn empty_site_rates_are_zero_not_nan() {
    let tables = run(&fixture());
    let site = tables.site("SITE-02").unwrap();
    assert_eq!(site.enrollment_rate, 0.0);
    for severity in Severity::ALL {
        let row = tables.safety("SITE-02", severity).unwrap();
        assert_eq!(row.event_count, 0);
        assert_eq!(row.rate_per_100, 0.0);
    }

    let zero_target = Fixture {
        targets: BTreeMap::from([("SITE-01".to_string(), 0)]),
        ..fixture()
    };
    let tables = run(&zero_target);
    let site = tables.site("SITE-01").unwrap();
    assert_eq!(site.enrolled, 2);
    assert_eq!(site.enrollment_rate, 0.0);
}

#[test]
fn aggregation_is_idempotent() {
    let fixture = fixture();
    assert_eq!(run(&fixture), run(&fixture));
}

proptest! {
    #[test]
    fn aggregation_ignores_record_order(seed in any::<u64>()) {
        let original = fixture();
        let mut shuffled = fixture();
        let n = shuffled.subjects.len();
        shuffled.subjects.rotate_left((seed as usize) % n);
        let m = shuffled.events.len();
        shuffled.events.rotate_right((seed as usize / 7) % m);
        prop_assert_eq!(run(&original), run(&shuffled));
    }
}
