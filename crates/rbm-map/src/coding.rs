//! Field-level coding rules.

use rbm_model::{RawEncounter, ResolutionStatus, SubjectStatus};

/// Codes the source sex value as `M`, `F` or `U`.
///
/// Unrecognised values are returned upper-cased so validation can flag them.
pub fn code_sex(raw: &str) -> Option<String> {
    let upper = raw.trim().to_ascii_uppercase();
    let coded = match upper.as_str() {
        "" => return None,
        "M" | "MALE" => "M",
        "F" | "FEMALE" => "F",
        "U" | "UNK" | "UNKNOWN" => "U",
        _ => return Some(upper),
    };
    Some(coded.to_string())
}

/// Stable subject identifier for a patient.
pub fn subject_id(study_id: &str, patient_id: &str) -> String {
    format!("{study_id}-{:0>4}", patient_id.trim())
}

/// Status over all of a patient's encounters.
pub fn subject_status(encounters: &[&RawEncounter]) -> SubjectStatus {
    if encounters.iter().any(|encounter| encounter.expired) {
        SubjectStatus::Withdrawn
    } else if encounters
        .iter()
        .all(|encounter| encounter.discharge_time.is_some())
    {
        SubjectStatus::Completed
    } else {
        SubjectStatus::Enrolled
    }
}

/// Outcome of the encounter an event was observed in.
pub fn resolution(encounter: &RawEncounter) -> ResolutionStatus {
    if encounter.expired {
        ResolutionStatus::Fatal
    } else if encounter.discharge_time.is_some() {
        ResolutionStatus::Resolved
    } else {
        ResolutionStatus::Ongoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn encounter(id: &str) -> RawEncounter {
        let admit = NaiveDate::from_ymd_opt(2150, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        RawEncounter::new("7", id, admit)
    }

    #[test]
    fn test_code_sex() {
        assert_eq!(code_sex("m").as_deref(), Some("M"));
        assert_eq!(code_sex(" Female ").as_deref(), Some("F"));
        assert_eq!(code_sex("unk").as_deref(), Some("U"));
        assert_eq!(code_sex("x").as_deref(), Some("X"));
        assert_eq!(code_sex("  "), None);
    }

    #[test]
    fn test_subject_id_pads_patient() {
        assert_eq!(subject_id("ICU-RBM", "7"), "ICU-RBM-0007");
        assert_eq!(subject_id("ICU-RBM", "10006"), "ICU-RBM-10006");
    }

    #[test]
    fn test_subject_status() {
        let mut first = encounter("1");
        let mut second = encounter("2");
        assert_eq!(subject_status(&[&first, &second]), SubjectStatus::Enrolled);

        first.discharge_time = Some(first.admit_time);
        second.discharge_time = Some(second.admit_time);
        assert_eq!(subject_status(&[&first, &second]), SubjectStatus::Completed);

        second.expired = true;
        assert_eq!(subject_status(&[&first, &second]), SubjectStatus::Withdrawn);
    }

    #[test]
    fn test_resolution() {
        let mut enc = encounter("1");
        assert_eq!(resolution(&enc), ResolutionStatus::Ongoing);
        enc.discharge_time = Some(enc.admit_time);
        assert_eq!(resolution(&enc), ResolutionStatus::Resolved);
        enc.expired = true;
        assert_eq!(resolution(&enc), ResolutionStatus::Fatal);
    }
}
