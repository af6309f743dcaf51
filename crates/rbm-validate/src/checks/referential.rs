//! Foreign-key checks.

use rbm_model::{AdverseEvent, ValidationFinding};

use super::CheckContext;
use crate::rules::AE003;

pub fn check_event(ctx: &CheckContext<'_>, event: &AdverseEvent) -> Vec<ValidationFinding> {
    vec![AE003.evaluate(
        &event.event_id,
        ctx.subjects_by_id.contains_key(event.subject_id.as_str()),
        || format!("subject {} does not exist", event.subject_id),
    )]
}
