//! Trial-domain adverse event records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::enums::{ResolutionStatus, Severity, Validity};

/// A safety-relevant occurrence derived from one trigger firing on one
/// encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdverseEvent {
    /// `AE-{encounter_id}-{trigger_id}`.
    pub event_id: String,
    pub subject_id: String,
    pub encounter_id: String,
    pub trigger_id: String,
    pub term: String,
    pub onset_date: Option<NaiveDate>,
    /// Resolved severity; `None` when the trigger's code is not in the
    /// fixed order.
    pub severity: Option<Severity>,
    /// Severity code as configured on the trigger.
    pub severity_code: String,
    pub related: bool,
    pub site_id: String,
    pub resolution: ResolutionStatus,
    pub validity: Validity,
}

impl AdverseEvent {
    pub const REQUIRED_FIELDS: usize = 5;

    /// Builds the stable event identifier.
    pub fn event_id_for(encounter_id: &str, trigger_id: &str) -> String {
        format!("AE-{encounter_id}-{trigger_id}")
    }

    /// Required fields that are populated, out of [`AdverseEvent::REQUIRED_FIELDS`].
    pub fn fields_present(&self) -> usize {
        [
            !self.subject_id.trim().is_empty(),
            self.onset_date.is_some(),
            self.severity.is_some(),
            !self.site_id.trim().is_empty(),
            !self.term.trim().is_empty(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    /// Onset month as `YYYY-MM`.
    pub fn onset_period(&self) -> Option<String> {
        self.onset_date
            .map(|date| date.format("%Y-%m").to_string())
    }
}
