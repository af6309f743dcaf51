//! Range and code-list checks. Absent values are skipped; completeness
//! already reports them.

use rbm_model::{AdverseEvent, Subject, ValidationFinding};

use super::CheckContext;
use crate::rules::{AE002, AE005, SUBJ004, SUBJ005, SUBJ006, SUBJ007, SUBJ008};

const SEX_CODES: [&str; 3] = ["M", "F", "U"];

pub fn check_subject(ctx: &CheckContext<'_>, subject: &Subject) -> Vec<ValidationFinding> {
    let id = subject.subject_id.as_str();
    let options = ctx.options;
    let mut findings = Vec::new();

    if let Some(age) = subject.age {
        findings.push(SUBJ004.evaluate(
            id,
            age >= options.age_min && age <= options.age_max,
            || {
                format!(
                    "age {age} outside [{}, {}]",
                    options.age_min, options.age_max
                )
            },
        ));
    }
    if let Some(sex) = subject.sex.as_deref().filter(|sex| !sex.trim().is_empty()) {
        findings.push(SUBJ005.evaluate(id, SEX_CODES.contains(&sex), || {
            format!("sex code {sex:?} is not M, F or U")
        }));
    }
    if !subject.site_id.trim().is_empty() {
        findings.push(SUBJ006.evaluate(
            id,
            ctx.sites.contains(subject.site_id.as_str()),
            || format!("site {} is not an enumerated site", subject.site_id),
        ));
    }
    if let Some(age) = subject.age {
        findings.push(SUBJ007.evaluate(id, age >= options.adult_age, || {
            format!("age {age} below adult threshold {}", options.adult_age)
        }));
        findings.push(SUBJ008.evaluate(id, age <= options.deidentified_age, || {
            format!(
                "age {age} above {}; source age is de-identified",
                options.deidentified_age
            )
        }));
    }

    findings
}

pub fn check_event(ctx: &CheckContext<'_>, event: &AdverseEvent) -> Vec<ValidationFinding> {
    let id = event.event_id.as_str();
    let mut findings = Vec::new();

    if !event.severity_code.trim().is_empty() {
        findings.push(AE002.evaluate(id, event.severity.is_some(), || {
            format!(
                "severity code {:?} is not in the severity order",
                event.severity_code
            )
        }));
    }
    findings.push(AE005.evaluate(id, ctx.sites.contains(event.site_id.as_str()), || {
        format!("site {:?} is not an enumerated site", event.site_id)
    }));

    findings
}
