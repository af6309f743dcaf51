//! Required-field presence checks.

use rbm_model::{AdverseEvent, Subject, ValidationFinding};

use crate::rules::{AE001, SUBJ001, SUBJ002, SUBJ003};

pub fn check_subject(subject: &Subject) -> Vec<ValidationFinding> {
    let id = subject.subject_id.as_str();
    vec![
        SUBJ001.evaluate(id, !subject.site_id.trim().is_empty(), || {
            "site id is empty".to_string()
        }),
        SUBJ002.evaluate(id, subject.age.is_some(), || "age is missing".to_string()),
        SUBJ003.evaluate(
            id,
            subject.sex.as_deref().is_some_and(|sex| !sex.trim().is_empty()),
            || "sex is missing".to_string(),
        ),
    ]
}

pub fn check_event(event: &AdverseEvent) -> Vec<ValidationFinding> {
    vec![AE001.evaluate(
        &event.event_id,
        !event.severity_code.trim().is_empty(),
        || "severity code is empty".to_string(),
    )]
}
