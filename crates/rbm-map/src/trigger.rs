//! Compiled severity trigger rules.

use regex::Regex;
use rbm_model::{RawEncounter, Severity, TriggerPredicate, TriggerRule};
use tracing::warn;

use crate::error::{MapError, Result};

/// A trigger rule with its diagnosis pattern compiled.
#[derive(Debug)]
pub struct CompiledTrigger<'a> {
    pub rule: &'a TriggerRule,
    pattern: Option<Regex>,
    severity: Option<Severity>,
}

impl<'a> CompiledTrigger<'a> {
    pub fn compile(rule: &'a TriggerRule) -> Result<Self> {
        let pattern = match &rule.predicate {
            TriggerPredicate::Diagnosis { pattern } => {
                Some(
                    Regex::new(pattern).map_err(|source| MapError::InvalidPattern {
                        trigger: rule.id.clone(),
                        source,
                    })?,
                )
            }
            _ => None,
        };
        let severity = rule.severity.parse::<Severity>().ok();
        if severity.is_none() {
            warn!(
                trigger = %rule.id,
                code = %rule.severity,
                "trigger severity code is not in the severity order"
            );
        }
        Ok(Self {
            rule,
            pattern,
            severity,
        })
    }

    /// Severity resolved from the rule's code, if it is a known code.
    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    /// Whether the rule fires for an encounter. Missing values never fire.
    pub fn fires(&self, encounter: &RawEncounter) -> bool {
        match &self.rule.predicate {
            TriggerPredicate::Above { field, value } => encounter
                .clinical_value(*field)
                .is_some_and(|observed| observed > *value),
            TriggerPredicate::Below { field, value } => encounter
                .clinical_value(*field)
                .is_some_and(|observed| observed < *value),
            TriggerPredicate::OutsideRange { field, low, high } => encounter
                .clinical_value(*field)
                .is_some_and(|observed| observed < *low || observed > *high),
            TriggerPredicate::Diagnosis { .. } => self.pattern.as_ref().is_some_and(|pattern| {
                encounter
                    .diagnosis_codes
                    .iter()
                    .any(|code| pattern.is_match(code))
            }),
        }
    }
}
