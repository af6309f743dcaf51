//! SDTM DM export of mapped subjects.

use std::collections::BTreeMap;

use rbm_model::{
    AGE_UNIT_YEARS, DM_DOMAIN, DemographicsRecord, PipelineConfig, Subject, arm_code,
};
use tracing::debug;

/// DM rows for the subjects that count toward metrics, sorted by `USUBJID`.
///
/// Arms are assigned in turn within each site, walking subjects in subject
/// id order, so the allocation is a pure function of the subject set.
pub fn demographics(config: &PipelineConfig, subjects: &[Subject]) -> Vec<DemographicsRecord> {
    let mut by_site: BTreeMap<&str, Vec<&Subject>> = BTreeMap::new();
    for subject in subjects.iter().filter(|s| s.validity.is_countable()) {
        by_site.entry(subject.site_id.as_str()).or_default().push(subject);
    }

    let arms = &config.treatment_arms;
    let mut records = Vec::new();
    for (site_id, mut members) in by_site {
        members.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        for (slot, subject) in members.into_iter().enumerate() {
            let arm = arms
                .get(slot % arms.len().max(1))
                .cloned()
                .unwrap_or_default();
            records.push(record(&config.study_id, site_id, subject, arm));
        }
    }
    records.sort_by(|a, b| a.usubjid.cmp(&b.usubjid));
    debug!(rows = records.len(), "derived DM rows");
    records
}

fn record(study_id: &str, site_id: &str, subject: &Subject, arm: String) -> DemographicsRecord {
    let age = subject
        .age
        .filter(|age| (0.0..=f64::from(u32::MAX)).contains(age))
        .map(|age| age.floor() as u32);
    DemographicsRecord {
        studyid: study_id.to_string(),
        domain: DM_DOMAIN.to_string(),
        usubjid: subject.subject_id.clone(),
        subjid: subject.patient_id.clone(),
        siteid: site_id.to_string(),
        rfstdtc: subject.enrollment_date,
        age,
        ageu: age.map(|_| AGE_UNIT_YEARS.to_string()),
        sex: subject.sex.clone(),
        armcd: arm_code(&arm),
        arm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rbm_model::{SubjectStatus, Validity};

    fn subject(patient: &str, site: &str, validity: Validity) -> Subject {
        Subject {
            subject_id: format!("ICU-RBM-{patient:0>4}"),
            patient_id: patient.to_string(),
            site_id: site.to_string(),
            enrollment_date: NaiveDate::from_ymd_opt(2150, 4, 2).unwrap(),
            age: Some(63.7),
            age_band: None,
            sex: Some("M".to_string()),
            status: SubjectStatus::Completed,
            encounter_count: 1,
            validity,
        }
    }

    #[test]
    fn arms_alternate_within_each_site() {
        let config = PipelineConfig::default();
        let subjects = vec![
            subject("4", "SITE-02", Validity::Valid),
            subject("3", "SITE-01", Validity::Warning),
            subject("2", "SITE-02", Validity::Valid),
            subject("1", "SITE-01", Validity::Valid),
            subject("5", "SITE-01", Validity::Valid),
        ];

        let rows = demographics(&config, &subjects);
        let arms: Vec<(&str, &str)> = rows
            .iter()
            .map(|row| (row.usubjid.as_str(), row.arm.as_str()))
            .collect();
        assert_eq!(
            arms,
            vec![
                ("ICU-RBM-0001", "Active"),
                ("ICU-RBM-0002", "Active"),
                ("ICU-RBM-0003", "Control"),
                ("ICU-RBM-0004", "Control"),
                ("ICU-RBM-0005", "Active"),
            ]
        );
        assert_eq!(rows[0].armcd, "ACTIVE");
    }

    #[test]
    fn invalid_subjects_are_left_out() {
        let config = PipelineConfig::default();
        let subjects = vec![
            subject("1", "SITE-01", Validity::Invalid),
            subject("2", "SITE-01", Validity::Valid),
        ];

        let rows = demographics(&config, &subjects);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.usubjid, "ICU-RBM-0002");
        assert_eq!(row.subjid, "2");
        assert_eq!(row.domain, "DM");
        assert_eq!(row.studyid, "ICU-RBM");
        assert_eq!(row.age, Some(63));
        assert_eq!(row.ageu.as_deref(), Some("YEARS"));
        assert_eq!(row.arm, "Active");
    }

    #[test]
    fn missing_age_has_no_unit() {
        let config = PipelineConfig::default();
        let mut unknown_age = subject("9", "SITE-03", Validity::Warning);
        unknown_age.age = None;

        let rows = demographics(&config, &[unknown_age]);
        assert_eq!(rows[0].age, None);
        assert_eq!(rows[0].ageu, None);
    }
}
