use std::collections::BTreeSet;

use chrono::NaiveDate;
use proptest::prelude::*;
use rbm_map::DomainMapper;
use rbm_model::{PipelineConfig, RawEncounter};

const UNITS: [&str; 6] = ["MICU", "SICU", "CCU", "CSRU", "TSICU", "NICU"];

prop_compose! {
    fn arb_encounter(id: usize)(
        patient in 1u32..12,
        padded in proptest::bool::weighted(0.2),
        reused_id in proptest::option::weighted(0.2, 0usize..4),
        day in 1u32..28,
        unit in 0usize..UNITS.len(),
        heart_rate in proptest::option::of(30.0f64..180.0),
        systolic_bp in proptest::option::of(50.0f64..160.0),
        with_event_time in any::<bool>(),
        discharged in any::<bool>(),
        expired in any::<bool>(),
        sepsis in any::<bool>(),
    ) -> RawEncounter {
        let admit = NaiveDate::from_ymd_opt(2150, 5, day)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        // "0007" and "7" derive the same subject id
        let patient_id = if padded { format!("{patient:04}") } else { patient.to_string() };
        let encounter_id = format!("{}", 100_000 + reused_id.unwrap_or(id));
        let mut encounter = RawEncounter::new(patient_id, encounter_id, admit);
        encounter.age = Some(40.0 + f64::from(patient));
        encounter.sex = Some("M".to_string());
        encounter.care_unit = Some(UNITS[unit].to_string());
        encounter.heart_rate = heart_rate;
        encounter.systolic_bp = systolic_bp;
        encounter.event_time = with_event_time.then(|| admit + chrono::Duration::hours(3));
        encounter.discharge_time = discharged.then(|| admit + chrono::Duration::days(2));
        encounter.expired = expired;
        if sepsis {
            encounter.diagnosis_codes = vec!["995.91".to_string()];
        }
        encounter
    }
}

fn arb_encounters() -> impl Strategy<Value = Vec<RawEncounter>> {
    (1usize..30).prop_flat_map(|len| (0..len).map(arb_encounter).collect::<Vec<_>>())
}

proptest! {
    #[test]
    fn mapping_is_independent_of_input_order(
        (encounters, shuffled) in arb_encounters()
            .prop_flat_map(|encs| (Just(encs.clone()), Just(encs).prop_shuffle()))
    ) {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        prop_assert_eq!(mapper.map(&encounters), mapper.map(&shuffled));
    }

    #[test]
    fn events_always_reference_mapped_subjects(encounters in arb_encounters()) {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let mapped = mapper.map(&encounters);
        for event in &mapped.adverse_events {
            prop_assert!(mapped.subjects.iter().any(|s| s.subject_id == event.subject_id));
        }
        let patients: BTreeSet<&str> =
            encounters.iter().map(|e| e.patient_id.as_str()).collect();
        prop_assert_eq!(mapped.subjects.len() + mapped.unassigned_patients, patients.len());
    }

    #[test]
    fn mapped_keys_are_unique(encounters in arb_encounters()) {
        let config = PipelineConfig::default();
        let mapper = DomainMapper::new(&config).unwrap();
        let mapped = mapper.map(&encounters);
        let subject_ids: BTreeSet<&str> =
            mapped.subjects.iter().map(|s| s.subject_id.as_str()).collect();
        prop_assert_eq!(subject_ids.len(), mapped.subjects.len());
        let event_ids: BTreeSet<&str> =
            mapped.adverse_events.iter().map(|e| e.event_id.as_str()).collect();
        prop_assert_eq!(event_ids.len(), mapped.adverse_events.len());
        let folded: usize = mapped.subjects.iter().map(|s| s.encounter_count).sum();
        prop_assert_eq!(folded + mapped.excluded_encounters, encounters.len());
    }
}
