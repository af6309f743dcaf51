use serde::{Deserialize, Serialize};

use crate::enums::{FindingCategory, FindingOutcome, RecordType, Validity};

/// Result of one rule applied to one record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidationFinding {
    /// Rule identifier (e.g. "SUBJ004", "MAP001").
    pub rule_id: String,
    pub category: FindingCategory,
    pub record_type: RecordType,
    /// Natural key of the target record (subject id, event id, encounter id
    /// or `row:<n>` for unparsable rows).
    pub record_id: String,
    pub outcome: FindingOutcome,
    pub message: String,
}

impl ValidationFinding {
    pub fn new(
        rule_id: impl Into<String>,
        category: FindingCategory,
        record_type: RecordType,
        record_id: impl Into<String>,
        outcome: FindingOutcome,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            category,
            record_type,
            record_id: record_id.into(),
            outcome,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == FindingOutcome::Fail
    }
}

/// Findings for a run, with count helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingReport {
    pub findings: Vec<ValidationFinding>,
}

impl FindingReport {
    pub fn count(&self, outcome: FindingOutcome) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.outcome == outcome)
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.count(FindingOutcome::Fail)
    }

    pub fn warning_count(&self) -> usize {
        self.count(FindingOutcome::Warning)
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Findings produced by a given rule.
    pub fn for_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a ValidationFinding> {
        self.findings
            .iter()
            .filter(move |finding| finding.rule_id == rule_id)
    }

    /// Worst outcome recorded against a record.
    pub fn validity_of(&self, record_type: RecordType, record_id: &str) -> Validity {
        self.findings
            .iter()
            .filter(|finding| finding.record_type == record_type && finding.record_id == record_id)
            .map(|finding| finding.outcome.validity())
            .max()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule: &str, id: &str, outcome: FindingOutcome) -> ValidationFinding {
        ValidationFinding::new(
            rule,
            FindingCategory::Range,
            RecordType::Subject,
            id,
            outcome,
            "message",
        )
    }

    #[test]
    fn report_counts() {
        let report = FindingReport {
            findings: vec![
                finding("SUBJ004", "S-1", FindingOutcome::Fail),
                finding("SUBJ007", "S-1", FindingOutcome::Warning),
                finding("SUBJ005", "S-2", FindingOutcome::Pass),
            ],
        };
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.count(FindingOutcome::Pass), 1);
        assert!(report.has_failures());
        assert_eq!(report.for_rule("SUBJ007").count(), 1);
    }

    #[test]
    fn validity_is_worst_outcome() {
        let report = FindingReport {
            findings: vec![
                finding("SUBJ004", "S-1", FindingOutcome::Pass),
                finding("SUBJ007", "S-1", FindingOutcome::Warning),
                finding("SUBJ004", "S-2", FindingOutcome::Fail),
            ],
        };
        assert_eq!(
            report.validity_of(RecordType::Subject, "S-1"),
            Validity::Warning
        );
        assert_eq!(
            report.validity_of(RecordType::Subject, "S-2"),
            Validity::Invalid
        );
        assert_eq!(
            report.validity_of(RecordType::Subject, "S-3"),
            Validity::Valid
        );
    }
}
