//! Validation check modules.
//!
//! Each module evaluates one rule category.

mod completeness;
mod consistency;
mod range;
mod referential;

use std::collections::{BTreeMap, BTreeSet};

use rbm_model::{AdverseEvent, Subject, ValidationFinding, ValidationOptions};

/// Shared lookup state for one validation pass.
pub struct CheckContext<'a> {
    pub options: &'a ValidationOptions,
    pub sites: BTreeSet<&'a str>,
    pub subjects_by_id: BTreeMap<&'a str, &'a Subject>,
}

impl<'a> CheckContext<'a> {
    pub fn new(options: &'a ValidationOptions, sites: &'a [String], subjects: &'a [Subject]) -> Self {
        Self {
            options,
            sites: sites.iter().map(String::as_str).collect(),
            subjects_by_id: subjects
                .iter()
                .map(|subject| (subject.subject_id.as_str(), subject))
                .collect(),
        }
    }
}

/// Run every check, in rule order, over subjects then adverse events.
pub fn run_all(
    ctx: &CheckContext<'_>,
    subjects: &[Subject],
    events: &[AdverseEvent],
) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();

    for subject in subjects {
        // 1. Required demographics (SUBJ001-003)
        findings.extend(completeness::check_subject(subject));
        // 2. Value ranges and code lists (SUBJ004-008)
        findings.extend(range::check_subject(ctx, subject));
    }

    for event in events {
        // 3. Severity code present (AE001)
        findings.extend(completeness::check_event(event));
        // 4. Severity order and site (AE002, AE005)
        findings.extend(range::check_event(ctx, event));
        // 5. Subject reference (AE003)
        findings.extend(referential::check_event(ctx, event));
        // 6. Onset against enrollment (AE004)
        findings.extend(consistency::check_event(ctx, event));
    }

    findings
}
