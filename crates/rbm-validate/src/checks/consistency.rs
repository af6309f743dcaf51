//! Cross-record date consistency.

use rbm_model::{AdverseEvent, ValidationFinding};

use super::CheckContext;
use crate::rules::AE004;

/// Onset must not precede the subject's enrollment. Skipped when either
/// date is unknown.
pub fn check_event(ctx: &CheckContext<'_>, event: &AdverseEvent) -> Vec<ValidationFinding> {
    let Some(onset) = event.onset_date else {
        return Vec::new();
    };
    let Some(subject) = ctx.subjects_by_id.get(event.subject_id.as_str()) else {
        return Vec::new();
    };
    vec![AE004.evaluate(
        &event.event_id,
        onset >= subject.enrollment_date,
        || {
            format!(
                "onset {onset} precedes enrollment {}",
                subject.enrollment_date
            )
        },
    )]
}
