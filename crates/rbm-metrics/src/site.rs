//! Per-site enrollment metrics.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rbm_model::metrics::{round2, round_to, safe_ratio};
use rbm_model::{AdverseEvent, SiteMetric, Subject};

#[derive(Default)]
struct SiteAccumulator {
    enrolled: usize,
    submitted: usize,
    ae_count: usize,
    age_sum: f64,
    aged: usize,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

/// One row per configured site, including sites with no subjects.
pub fn site_metrics(
    targets: &BTreeMap<String, u32>,
    subjects: &[Subject],
    events: &[AdverseEvent],
) -> Vec<SiteMetric> {
    let mut by_site: BTreeMap<&str, SiteAccumulator> = targets
        .keys()
        .map(|site| (site.as_str(), SiteAccumulator::default()))
        .collect();

    for subject in subjects {
        let Some(acc) = by_site.get_mut(subject.site_id.as_str()) else {
            continue;
        };
        acc.submitted += 1;
        if !subject.validity.is_countable() {
            continue;
        }
        acc.enrolled += 1;
        if let Some(age) = subject.age {
            acc.age_sum += age;
            acc.aged += 1;
        }
        let date = subject.enrollment_date;
        acc.first = Some(acc.first.map_or(date, |first| first.min(date)));
        acc.last = Some(acc.last.map_or(date, |last| last.max(date)));
    }

    for event in events.iter().filter(|event| event.validity.is_countable()) {
        if let Some(acc) = by_site.get_mut(event.site_id.as_str()) {
            acc.ae_count += 1;
        }
    }

    by_site
        .into_iter()
        .map(|(site_id, acc)| {
            let target = targets.get(site_id).copied().unwrap_or_default();
            SiteMetric {
                site_id: site_id.to_string(),
                enrolled: acc.enrolled,
                submitted: acc.submitted,
                target,
                enrollment_rate: round_to(
                    safe_ratio(acc.enrolled as f64, f64::from(target)),
                    4,
                ),
                ae_count: acc.ae_count,
                mean_age: (acc.aged > 0).then(|| round2(acc.age_sum / acc.aged as f64)),
                first_enrollment: acc.first,
                last_enrollment: acc.last,
            }
        })
        .collect()
}
