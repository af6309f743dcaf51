//! Validation of mapped trial records.
//!
//! Applies the fixed rule catalog in [`rules`] to subjects and adverse
//! events, merges in load and mapping findings, and tags each record as
//! valid, warning or invalid. Pass outcomes are recorded so the quality
//! score can be derived from the findings alone.

mod checks;
mod engine;
pub mod rules;

pub use engine::{ValidatedDataset, ValidationEngine};
pub use rules::{RULES, RuleDef, rule_by_id};
