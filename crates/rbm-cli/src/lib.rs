//! Orchestration and logging for the ICU trial monitoring pipeline.

pub mod logging;
pub mod pipeline;
