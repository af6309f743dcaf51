//! Validation engine: runs the rule catalog and tags record validity.

use std::collections::BTreeMap;

use rbm_model::metrics::{round2, safe_ratio};
use rbm_model::{
    AdverseEvent, FindingOutcome, FindingReport, RecordType, Subject, ValidationFinding,
    ValidationOptions, Validity,
};
use tracing::{debug, info, info_span};

use crate::checks::{CheckContext, run_all};

/// Validated records with their findings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedDataset {
    pub subjects: Vec<Subject>,
    pub adverse_events: Vec<AdverseEvent>,
    /// Load, mapping and rule findings, sorted.
    pub report: FindingReport,
    /// Passed checks over evaluated checks, as a percentage.
    pub quality_score: f64,
}

/// Runs the fixed rule set against mapped records.
#[derive(Debug, Clone)]
pub struct ValidationEngine<'a> {
    options: &'a ValidationOptions,
    sites: &'a [String],
}

impl<'a> ValidationEngine<'a> {
    pub fn new(options: &'a ValidationOptions, sites: &'a [String]) -> Self {
        Self { options, sites }
    }

    /// Validate subjects and events.
    ///
    /// `prior_findings` are load and mapping findings; they take part in
    /// validity tagging and the quality score like rule findings do.
    pub fn validate(
        &self,
        mut subjects: Vec<Subject>,
        mut adverse_events: Vec<AdverseEvent>,
        prior_findings: Vec<ValidationFinding>,
    ) -> ValidatedDataset {
        let span = info_span!(
            "validate",
            subjects = subjects.len(),
            adverse_events = adverse_events.len()
        );
        let _guard = span.enter();

        let rule_findings = {
            let ctx = CheckContext::new(self.options, self.sites, &subjects);
            run_all(&ctx, &subjects, &adverse_events)
        };

        let mut findings = prior_findings;
        findings.extend(rule_findings);
        findings.sort();

        let validity = validity_index(&findings);
        for subject in &mut subjects {
            subject.validity = lookup(&validity, RecordType::Subject, &subject.subject_id);
        }
        for event in &mut adverse_events {
            event.validity = lookup(&validity, RecordType::AdverseEvent, &event.event_id);
        }

        let report = FindingReport { findings };
        let passed = report.count(FindingOutcome::Pass);
        let quality_score = round2(safe_ratio(
            passed as f64,
            report.findings.len() as f64,
        ) * 100.0);

        for finding in report.findings.iter().filter(|f| f.is_failure()) {
            debug!(
                rule = %finding.rule_id,
                record = %finding.record_id,
                "validation failure"
            );
        }
        info!(
            passed,
            warnings = report.warning_count(),
            failures = report.failure_count(),
            quality_score,
            "validation complete"
        );

        ValidatedDataset {
            subjects,
            adverse_events,
            report,
            quality_score,
        }
    }
}

fn validity_index(findings: &[ValidationFinding]) -> BTreeMap<(RecordType, &str), Validity> {
    let mut index: BTreeMap<(RecordType, &str), Validity> = BTreeMap::new();
    for finding in findings {
        let entry = index
            .entry((finding.record_type, finding.record_id.as_str()))
            .or_default();
        *entry = (*entry).max(finding.outcome.validity());
    }
    index
}

fn lookup(index: &BTreeMap<(RecordType, &str), Validity>, record_type: RecordType, id: &str) -> Validity {
    index.get(&(record_type, id)).copied().unwrap_or_default()
}
