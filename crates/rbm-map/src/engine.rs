//! Mapping engine: raw encounters to subjects and adverse events.

use std::collections::{BTreeMap, BTreeSet};

use rbm_model::{
    AdverseEvent, AgeBand, FindingCategory, FindingOutcome, PipelineConfig, RawEncounter,
    RecordType, Subject, ValidationFinding, Validity,
};
use tracing::{debug, info, info_span, warn};

use crate::coding::{code_sex, resolution, subject_id, subject_status};
use crate::error::Result;
use crate::trigger::CompiledTrigger;

/// Rule id of the finding raised for a patient whose enrollment unit has
/// no site.
pub const UNKNOWN_SITE_RULE_ID: &str = "MAP001";
/// Rule id of the finding raised for an event without an onset timestamp.
pub const MISSING_ONSET_RULE_ID: &str = "MAP002";
/// Rule id of the finding raised for an encounter id found on more than one
/// source row.
pub const DUPLICATE_ENCOUNTER_RULE_ID: &str = "MAP003";
/// Rule id of the finding raised for distinct patients that derive the same
/// subject id.
pub const SHARED_SUBJECT_ID_RULE_ID: &str = "MAP004";

/// Output of the mapper, sorted by natural key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedDataset {
    pub subjects: Vec<Subject>,
    pub adverse_events: Vec<AdverseEvent>,
    pub findings: Vec<ValidationFinding>,
    /// Patients excluded for an unknown site, a shared subject id, or
    /// because every one of their encounters was excluded.
    pub unassigned_patients: usize,
    /// Encounters with a repeated id plus the encounters of unassigned
    /// patients.
    pub excluded_encounters: usize,
}

/// Maps encounters using the unit→site table and trigger rules of a config.
#[derive(Debug)]
pub struct DomainMapper<'a> {
    config: &'a PipelineConfig,
    triggers: Vec<CompiledTrigger<'a>>,
}

impl<'a> DomainMapper<'a> {
    /// Compiles the trigger rules of `config`.
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        let triggers = config
            .severity_trigger_rules
            .iter()
            .map(CompiledTrigger::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, triggers })
    }

    /// Map all encounters. The result does not depend on input order.
    pub fn map(&self, encounters: &[RawEncounter]) -> MappedDataset {
        let span = info_span!("map", encounters = encounters.len());
        let _guard = span.enter();

        let mut dataset = MappedDataset::default();
        let repeated = exclude_repeated_encounters(encounters, &mut dataset);

        let mut by_patient: BTreeMap<&str, Vec<&RawEncounter>> = BTreeMap::new();
        for encounter in encounters {
            let history = by_patient.entry(encounter.patient_id.as_str()).or_default();
            if !repeated.contains(encounter.encounter_id.as_str()) {
                history.push(encounter);
            }
        }

        let mut by_subject: BTreeMap<String, Vec<(&str, Vec<&RawEncounter>)>> = BTreeMap::new();
        for (patient_id, history) in by_patient {
            if history.is_empty() {
                dataset.unassigned_patients += 1;
                continue;
            }
            by_subject
                .entry(subject_id(&self.config.study_id, patient_id))
                .or_default()
                .push((patient_id, history));
        }

        for (subject_id, patients) in by_subject {
            if patients.len() > 1 {
                exclude_shared_subject_id(&subject_id, &patients, &mut dataset);
                continue;
            }
            for (patient_id, mut history) in patients {
                // encounter ids are unique here, so the order is total
                history.sort_by(|a, b| a.chronology_key().cmp(&b.chronology_key()));
                self.map_patient(patient_id, subject_id.clone(), &history, &mut dataset);
            }
        }

        dataset
            .subjects
            .sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        dataset
            .adverse_events
            .sort_by(|a, b| a.event_id.cmp(&b.event_id));
        dataset.findings.sort();

        info!(
            subjects = dataset.subjects.len(),
            adverse_events = dataset.adverse_events.len(),
            unassigned = dataset.unassigned_patients,
            findings = dataset.findings.len(),
            "mapped encounters"
        );
        dataset
    }

    fn map_patient(
        &self,
        patient_id: &str,
        subject_id: String,
        history: &[&RawEncounter],
        out: &mut MappedDataset,
    ) {
        let Some(enrollment) = history.first() else {
            return;
        };
        let unit = enrollment.care_unit.as_deref().unwrap_or_default();

        let Some(site_id) = self.config.site_for_unit(unit) else {
            warn!(unit = %unit, "enrollment unit has no site; patient excluded");
            out.unassigned_patients += 1;
            out.excluded_encounters += history.len();
            out.findings.push(ValidationFinding::new(
                UNKNOWN_SITE_RULE_ID,
                FindingCategory::Mapping,
                RecordType::Subject,
                subject_id,
                FindingOutcome::Fail,
                format!("care unit {unit:?} does not map to a site"),
            ));
            return;
        };

        let age = enrollment.age;
        out.subjects.push(Subject {
            subject_id: subject_id.clone(),
            patient_id: patient_id.to_string(),
            site_id: site_id.to_string(),
            enrollment_date: enrollment.admit_time.date(),
            age,
            age_band: age.and_then(|years| AgeBand::for_age(years, self.config.age_band_width)),
            sex: enrollment.sex.as_deref().and_then(code_sex),
            status: subject_status(history),
            encounter_count: history.len(),
            validity: Validity::Valid,
        });

        for encounter in history {
            for trigger in self.triggers.iter().filter(|t| t.fires(encounter)) {
                let event = self.build_event(&subject_id, site_id, encounter, trigger);
                if event.onset_date.is_none() {
                    out.findings.push(ValidationFinding::new(
                        MISSING_ONSET_RULE_ID,
                        FindingCategory::Mapping,
                        RecordType::AdverseEvent,
                        event.event_id.clone(),
                        FindingOutcome::Fail,
                        "event timestamp missing; onset date unknown",
                    ));
                }
                debug!(event = %event.event_id, trigger = %trigger.rule.id, "adverse event");
                out.adverse_events.push(event);
            }
        }
    }

    fn build_event(
        &self,
        subject_id: &str,
        site_id: &str,
        encounter: &RawEncounter,
        trigger: &CompiledTrigger<'_>,
    ) -> AdverseEvent {
        let rule = trigger.rule;
        AdverseEvent {
            event_id: AdverseEvent::event_id_for(&encounter.encounter_id, &rule.id),
            subject_id: subject_id.to_string(),
            encounter_id: encounter.encounter_id.clone(),
            trigger_id: rule.id.clone(),
            term: rule.term.clone(),
            onset_date: encounter.event_time.map(|time| time.date()),
            severity: trigger.severity(),
            severity_code: rule.severity.clone(),
            related: rule.related,
            site_id: site_id.to_string(),
            resolution: resolution(encounter),
            validity: Validity::Valid,
        }
    }
}

/// Excludes every row whose encounter id appears more than once and returns
/// the excluded ids.
fn exclude_repeated_encounters<'e>(
    encounters: &'e [RawEncounter],
    out: &mut MappedDataset,
) -> BTreeSet<&'e str> {
    let mut rows: BTreeMap<&str, usize> = BTreeMap::new();
    for encounter in encounters {
        *rows.entry(encounter.encounter_id.as_str()).or_default() += 1;
    }

    let mut repeated = BTreeSet::new();
    for (encounter_id, count) in rows.into_iter().filter(|(_, count)| *count > 1) {
        warn!(rows = count, "encounter id repeated; rows excluded");
        out.excluded_encounters += count;
        out.findings.push(ValidationFinding::new(
            DUPLICATE_ENCOUNTER_RULE_ID,
            FindingCategory::Mapping,
            RecordType::Encounter,
            encounter_id,
            FindingOutcome::Fail,
            format!("encounter id appears on {count} source rows; all of them excluded"),
        ));
        repeated.insert(encounter_id);
    }
    repeated
}

fn exclude_shared_subject_id(
    subject_id: &str,
    patients: &[(&str, Vec<&RawEncounter>)],
    out: &mut MappedDataset,
) {
    warn!(
        patients = patients.len(),
        "patients derive the same subject id; patients excluded"
    );
    for (patient_id, history) in patients {
        out.unassigned_patients += 1;
        out.excluded_encounters += history.len();
        out.findings.push(ValidationFinding::new(
            SHARED_SUBJECT_ID_RULE_ID,
            FindingCategory::Mapping,
            RecordType::Subject,
            subject_id,
            FindingOutcome::Fail,
            format!("patient {patient_id:?} shares this subject id with another patient"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rbm_model::{ClinicalField, Severity, SubjectStatus, TriggerPredicate, TriggerRule};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2150, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn encounter(patient: &str, id: &str, day: u32, unit: &str) -> RawEncounter {
        let mut enc = RawEncounter::new(patient, id, at(day, 8));
        enc.age = Some(64.0);
        enc.sex = Some("female".to_string());
        enc.care_unit = Some(unit.to_string());
        enc.event_time = Some(at(day, 12));
        enc
    }

    #[test]
    fn enrollment_encounter_is_earliest() {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let mut later = encounter("7", "200", 9, "SICU");
        later.age = Some(65.0);
        let earlier = encounter("7", "100", 2, "MICU");

        let mapped = mapper.map(&[later, earlier]);
        assert_eq!(mapped.subjects.len(), 1);
        let subject = &mapped.subjects[0];
        assert_eq!(subject.subject_id, "ICU-RBM-0007");
        assert_eq!(subject.site_id, "SITE-01");
        assert_eq!(subject.enrollment_date, at(2, 8).date());
        assert_eq!(subject.age, Some(64.0));
        assert_eq!(subject.age_band.map(|b| b.to_string()).as_deref(), Some("60-69"));
        assert_eq!(subject.sex.as_deref(), Some("F"));
        assert_eq!(subject.encounter_count, 2);
        assert_eq!(subject.status, SubjectStatus::Enrolled);
    }

    #[test]
    fn unknown_unit_excludes_patient_and_events() {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let mut enc = encounter("8", "300", 3, "NICU");
        enc.heart_rate = Some(150.0);

        let mapped = mapper.map(&[enc]);
        assert!(mapped.subjects.is_empty());
        assert!(mapped.adverse_events.is_empty());
        assert_eq!(mapped.unassigned_patients, 1);
        assert_eq!(mapped.excluded_encounters, 1);
        assert_eq!(mapped.findings.len(), 1);
        assert_eq!(mapped.findings[0].rule_id, UNKNOWN_SITE_RULE_ID);
        assert_eq!(mapped.findings[0].record_id, "ICU-RBM-0008");
    }

    #[test]
    fn triggers_yield_events_per_encounter() {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let mut first = encounter("9", "400", 4, "CCU");
        first.heart_rate = Some(140.0);
        first.systolic_bp = Some(65.0);
        first.discharge_time = Some(at(6, 8));
        let mut second = encounter("9", "401", 10, "CCU");
        second.diagnosis_codes = vec!["995.92".to_string()];
        second.expired = true;

        let mapped = mapper.map(&[first, second]);
        let ids: Vec<&str> = mapped
            .adverse_events
            .iter()
            .map(|event| event.event_id.as_str())
            .collect();
        // SBP 65 fires both hypotension and shock
        assert_eq!(ids, vec!["AE-400-T01", "AE-400-T03", "AE-400-T04", "AE-401-T10"]);

        let shock = &mapped.adverse_events[2];
        assert_eq!(shock.severity, Some(Severity::LifeThreatening));
        assert_eq!(shock.resolution, rbm_model::ResolutionStatus::Resolved);
        assert_eq!(shock.site_id, "SITE-03");
        let sepsis = &mapped.adverse_events[3];
        assert_eq!(sepsis.resolution, rbm_model::ResolutionStatus::Fatal);
        assert_eq!(mapped.subjects[0].status, SubjectStatus::Withdrawn);
    }

    #[test]
    fn missing_onset_keeps_event_with_finding() {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let mut enc = encounter("10", "500", 5, "CSRU");
        enc.event_time = None;
        enc.spo2 = Some(80.0);

        let mapped = mapper.map(&[enc]);
        assert_eq!(mapped.adverse_events.len(), 1);
        assert!(mapped.adverse_events[0].onset_date.is_none());
        assert_eq!(mapped.findings.len(), 1);
        assert_eq!(mapped.findings[0].rule_id, MISSING_ONSET_RULE_ID);
        assert_eq!(mapped.findings[0].record_id, "AE-500-T05");
    }

    #[test]
    fn unknown_severity_code_leaves_severity_unset() {
        let config = PipelineConfig {
            severity_trigger_rules: vec![TriggerRule {
                id: "Z1".to_string(),
                term: "Odd".to_string(),
                severity: "grade-9".to_string(),
                related: true,
                predicate: TriggerPredicate::Above {
                    field: ClinicalField::Lactate,
                    value: 1.0,
                },
            }],
            ..PipelineConfig::default()
        };
        let mapper = DomainMapper::new(&config).unwrap();
        let mut enc = encounter("11", "600", 5, "TSICU");
        enc.lactate = Some(2.0);

        let mapped = mapper.map(&[enc]);
        let event = &mapped.adverse_events[0];
        assert_eq!(event.severity, None);
        assert_eq!(event.severity_code, "grade-9");
        assert!(event.related);
    }

    #[test]
    fn repeated_encounter_id_is_excluded_in_any_order() {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let mut micu = encounter("12", "700", 6, "MICU");
        micu.heart_rate = Some(140.0);
        let sicu = encounter("12", "700", 6, "SICU");
        let other = encounter("12", "701", 8, "CCU");

        let forward = mapper.map(&[micu.clone(), sicu.clone(), other.clone()]);
        let backward = mapper.map(&[other, sicu, micu]);
        assert_eq!(forward, backward);

        assert_eq!(forward.subjects.len(), 1);
        assert_eq!(forward.subjects[0].site_id, "SITE-03");
        assert_eq!(forward.subjects[0].encounter_count, 1);
        assert!(forward.adverse_events.is_empty());
        assert_eq!(forward.excluded_encounters, 2);
        let finding = &forward.findings[0];
        assert_eq!(finding.rule_id, DUPLICATE_ENCOUNTER_RULE_ID);
        assert_eq!(finding.record_type, RecordType::Encounter);
        assert_eq!(finding.record_id, "700");
    }

    #[test]
    fn patient_with_only_repeated_encounters_is_unassigned() {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let first = encounter("13", "800", 6, "MICU");
        let second = encounter("14", "800", 7, "MICU");

        let mapped = mapper.map(&[first, second]);
        assert!(mapped.subjects.is_empty());
        assert_eq!(mapped.unassigned_patients, 2);
        assert_eq!(mapped.excluded_encounters, 2);
        assert_eq!(mapped.findings.len(), 1);
    }

    #[test]
    fn patients_sharing_a_subject_id_are_excluded() {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let short = encounter("7", "900", 2, "MICU");
        let padded = encounter("0007", "901", 3, "SICU");
        let distinct = encounter("70", "902", 4, "CCU");

        let mapped = mapper.map(&[short, padded, distinct]);
        let ids: Vec<(&str, &str)> = mapped
            .subjects
            .iter()
            .map(|subject| (subject.subject_id.as_str(), subject.patient_id.as_str()))
            .collect();
        assert_eq!(ids, vec![("ICU-RBM-0070", "70")]);
        assert_eq!(mapped.unassigned_patients, 2);
        assert_eq!(mapped.excluded_encounters, 2);

        let shared: Vec<_> = mapped
            .findings
            .iter()
            .filter(|finding| finding.rule_id == SHARED_SUBJECT_ID_RULE_ID)
            .collect();
        assert_eq!(shared.len(), 2);
        assert!(shared.iter().all(|finding| finding.record_id == "ICU-RBM-0007"));
    }

    #[test]
    fn huge_age_maps_without_band() {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let mut enc = encounter("15", "950", 2, "MICU");
        enc.age = Some(1e10);

        let mapped = mapper.map(&[enc]);
        assert_eq!(mapped.subjects[0].age, Some(1e10));
        assert_eq!(mapped.subjects[0].age_band, None);
    }
}
