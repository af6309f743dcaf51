//! Adverse event counts by site, severity and onset month.

use std::collections::{BTreeMap, BTreeSet};

use rbm_model::metrics::{round2, safe_ratio};
use rbm_model::{ALL_PERIODS, AdverseEvent, SafetyMetric, Severity, SiteMetric};

#[derive(Default)]
struct Group<'a> {
    events: usize,
    subjects: BTreeSet<&'a str>,
}

impl<'a> Group<'a> {
    fn add(&mut self, event: &'a AdverseEvent) {
        self.events += 1;
        self.subjects.insert(event.subject_id.as_str());
    }
}

/// All-time rows for every site × severity, then monthly rows for
/// non-empty groups. Only countable events with a resolved severity are
/// counted; rates use the site's enrolled subjects as denominator.
pub fn safety_metrics(sites: &[SiteMetric], events: &[AdverseEvent]) -> Vec<SafetyMetric> {
    let enrolled: BTreeMap<&str, usize> = sites
        .iter()
        .map(|site| (site.site_id.as_str(), site.enrolled))
        .collect();

    let mut all_time: BTreeMap<(&str, Severity), Group<'_>> = BTreeMap::new();
    for site in enrolled.keys() {
        for severity in Severity::ALL {
            all_time.insert((*site, severity), Group::default());
        }
    }
    let mut monthly: BTreeMap<(&str, Severity, String), Group<'_>> = BTreeMap::new();

    for event in events.iter().filter(|event| event.validity.is_countable()) {
        let Some(severity) = event.severity else {
            continue;
        };
        let site = event.site_id.as_str();
        let Some(group) = all_time.get_mut(&(site, severity)) else {
            continue;
        };
        group.add(event);
        if let Some(period) = event.onset_period() {
            monthly.entry((site, severity, period)).or_default().add(event);
        }
    }

    let row = |site: &str, severity: Severity, period: String, group: &Group<'_>| {
        let denominator = enrolled.get(site).copied().unwrap_or_default();
        SafetyMetric {
            site_id: site.to_string(),
            severity,
            period,
            event_count: group.events,
            subjects_with_event: group.subjects.len(),
            rate_per_100: round2(safe_ratio(group.events as f64, denominator as f64) * 100.0),
        }
    };

    let mut rows: Vec<SafetyMetric> = all_time
        .iter()
        .map(|((site, severity), group)| row(*site, *severity, ALL_PERIODS.to_string(), group))
        .collect();
    rows.extend(
        monthly
            .iter()
            .map(|((site, severity, period), group)| row(*site, *severity, period.clone(), group)),
    );
    rows
}
