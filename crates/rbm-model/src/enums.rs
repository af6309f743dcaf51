//! Type-safe enumerations for trial-domain concepts.
//!
//! These enums give compile-time safety to values that appear as plain
//! strings in source data, configuration and snapshot tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Adverse event severity.
///
/// The variant order is the clinical order, so the derived `Ord` gives
/// `Mild < Moderate < Severe < LifeThreatening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    LifeThreatening,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 4] = [
        Severity::Mild,
        Severity::Moderate,
        Severity::Severe,
        Severity::LifeThreatening,
    ];

    /// Returns the code used in configuration and snapshot tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::LifeThreatening => "life-threatening",
        }
    }

    /// Position in the fixed order (1-based), comparable to a CTCAE grade.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Mild => 1,
            Severity::Moderate => 2,
            Severity::Severe => 3,
            Severity::LifeThreatening => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    /// Parse a severity code.
    ///
    /// Accepts the canonical codes, their upper-case forms and grade numbers
    /// 1-4. Anything else is an error; there is no fallback severity.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['_', ' '], "-");

        match normalized.as_str() {
            "MILD" | "1" => Ok(Severity::Mild),
            "MODERATE" | "2" => Ok(Severity::Moderate),
            "SEVERE" | "3" => Ok(Severity::Severe),
            "LIFE-THREATENING" | "LIFETHREATENING" | "4" => Ok(Severity::LifeThreatening),
            _ => Err(ModelError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Participation status of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectStatus {
    /// At least one encounter is still open.
    Enrolled,
    /// The patient expired during an encounter.
    Withdrawn,
    /// Every encounter ended with a discharge.
    Completed,
}

impl SubjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectStatus::Enrolled => "enrolled",
            SubjectStatus::Withdrawn => "withdrawn",
            SubjectStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SubjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an adverse event at the end of its encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    Ongoing,
    Resolved,
    Fatal,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Ongoing => "ongoing",
            ResolutionStatus::Resolved => "resolved",
            ResolutionStatus::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validity tag attached to a record after validation.
///
/// Ordered from best to worst so that `max()` over a record's findings
/// yields its overall validity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    #[default]
    Valid,
    Warning,
    Invalid,
}

impl Validity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Validity::Valid => "valid",
            Validity::Warning => "warning",
            Validity::Invalid => "invalid",
        }
    }

    /// Returns true if the record takes part in aggregate counts.
    pub fn is_countable(&self) -> bool {
        !matches!(self, Validity::Invalid)
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single rule applied to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingOutcome {
    Pass,
    Warning,
    Fail,
}

impl FindingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingOutcome::Pass => "pass",
            FindingOutcome::Warning => "warning",
            FindingOutcome::Fail => "fail",
        }
    }

    /// Validity contributed by this outcome.
    pub fn validity(&self) -> Validity {
        match self {
            FindingOutcome::Pass => Validity::Valid,
            FindingOutcome::Warning => Validity::Warning,
            FindingOutcome::Fail => Validity::Invalid,
        }
    }
}

impl fmt::Display for FindingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingCategory {
    /// Row could not be coerced by the loader.
    Load,
    /// Record could not be fully mapped (unknown site, missing onset).
    Mapping,
    Completeness,
    Range,
    Referential,
    Consistency,
}

impl FindingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::Load => "load",
            FindingCategory::Mapping => "mapping",
            FindingCategory::Completeness => "completeness",
            FindingCategory::Range => "range",
            FindingCategory::Referential => "referential",
            FindingCategory::Consistency => "consistency",
        }
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of record a finding or quality metric refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Encounter,
    Subject,
    AdverseEvent,
}

impl RecordType {
    pub const ALL: [RecordType; 3] = [
        RecordType::Encounter,
        RecordType::Subject,
        RecordType::AdverseEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Encounter => "encounter",
            RecordType::Subject => "subject",
            RecordType::AdverseEvent => "adverse_event",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "encounter" | "encounters" => Ok(RecordType::Encounter),
            "subject" | "subjects" => Ok(RecordType::Subject),
            "adverse_event" | "adverse_events" | "ae" => Ok(RecordType::AdverseEvent),
            _ => Err(ModelError::UnknownRecordType(s.to_string())),
        }
    }
}
