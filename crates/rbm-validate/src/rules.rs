//! The fixed rule catalog.

use rbm_model::{FindingCategory, FindingOutcome, RecordType, ValidationFinding};

use FindingCategory::{Completeness, Consistency, Range, Referential};
use FindingOutcome::{Fail, Warning};
use RecordType::{AdverseEvent, Subject};

/// Static description of one validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDef {
    pub id: &'static str,
    pub category: FindingCategory,
    pub record_type: RecordType,
    pub description: &'static str,
    /// Outcome recorded when the rule is breached.
    pub breach: FindingOutcome,
}

impl RuleDef {
    /// Finding for one evaluation of this rule against a record.
    pub fn evaluate(
        &self,
        record_id: &str,
        passed: bool,
        message: impl FnOnce() -> String,
    ) -> ValidationFinding {
        let (outcome, message) = if passed {
            (FindingOutcome::Pass, self.description.to_string())
        } else {
            (self.breach, message())
        };
        ValidationFinding::new(
            self.id,
            self.category,
            self.record_type,
            record_id,
            outcome,
            message,
        )
    }
}

const fn rule(
    id: &'static str,
    category: FindingCategory,
    record_type: RecordType,
    description: &'static str,
    breach: FindingOutcome,
) -> RuleDef {
    RuleDef {
        id,
        category,
        record_type,
        description,
        breach,
    }
}

pub const SUBJ001: RuleDef = rule("SUBJ001", Completeness, Subject, "site id present", Fail);
pub const SUBJ002: RuleDef = rule("SUBJ002", Completeness, Subject, "age present", Fail);
pub const SUBJ003: RuleDef = rule("SUBJ003", Completeness, Subject, "sex present", Fail);
pub const SUBJ004: RuleDef = rule("SUBJ004", Range, Subject, "age within plausible range", Fail);
pub const SUBJ005: RuleDef = rule("SUBJ005", Range, Subject, "sex coded as M, F or U", Fail);
pub const SUBJ006: RuleDef = rule("SUBJ006", Range, Subject, "site id is an enumerated site", Fail);
pub const SUBJ007: RuleDef = rule("SUBJ007", Range, Subject, "subject is an adult", Warning);
pub const SUBJ008: RuleDef = rule(
    "SUBJ008",
    Range,
    Subject,
    "age below de-identification ceiling",
    Warning,
);
pub const AE001: RuleDef = rule("AE001", Completeness, AdverseEvent, "severity code present", Fail);
pub const AE002: RuleDef = rule("AE002", Range, AdverseEvent, "severity code resolves", Fail);
pub const AE003: RuleDef = rule(
    "AE003",
    Referential,
    AdverseEvent,
    "subject id resolves to a subject",
    Fail,
);
pub const AE004: RuleDef = rule(
    "AE004",
    Consistency,
    AdverseEvent,
    "onset not before enrollment",
    Fail,
);
pub const AE005: RuleDef = rule("AE005", Range, AdverseEvent, "site id is an enumerated site", Fail);

/// Every rule, in evaluation order.
pub const RULES: [RuleDef; 13] = [
    SUBJ001, SUBJ002, SUBJ003, SUBJ004, SUBJ005, SUBJ006, SUBJ007, SUBJ008, AE001, AE002, AE003,
    AE004, AE005,
];

/// Look up a rule by id.
pub fn rule_by_id(id: &str) -> Option<&'static RuleDef> {
    RULES.iter().find(|rule| rule.id == id)
}
