//! Domain mapping from ICU encounters to trial records.
//!
//! Groups encounters by patient, derives one [`rbm_model::Subject`] per
//! patient whose enrollment unit maps to a site, and evaluates the
//! configured trigger rules against every encounter to produce
//! [`rbm_model::AdverseEvent`]s. Mapping is pure and its output is sorted
//! by natural key. [`demographics()`] derives the SDTM DM export once
//! subjects have been validated.

mod coding;
mod demographics;
mod engine;
mod error;
mod trigger;

pub use coding::{code_sex, resolution, subject_id, subject_status};
pub use demographics::demographics;
pub use engine::{
    DUPLICATE_ENCOUNTER_RULE_ID, DomainMapper, MISSING_ONSET_RULE_ID, MappedDataset,
    SHARED_SUBJECT_ID_RULE_ID, UNKNOWN_SITE_RULE_ID,
};
pub use error::{MapError, Result};
pub use trigger::CompiledTrigger;
