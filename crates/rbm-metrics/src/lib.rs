//! Monitoring metrics over the validated dataset.
//!
//! [`aggregate`] is a pure function of its input: ordered maps drive every
//! grouping, so unchanged input always yields identical tables.

mod quality;
mod safety;
mod site;

use std::collections::BTreeMap;

use rbm_model::{
    AdverseEvent, MetricTables, RawEncounter, RecordType, Subject, Validity,
};
use tracing::{info, info_span};

pub use quality::{RecordQuality, quality_row};
pub use safety::safety_metrics;
pub use site::site_metrics;

/// Everything the aggregator reads.
#[derive(Debug, Clone, Copy)]
pub struct AggregateInput<'a> {
    /// Enrollment target per configured site.
    pub targets: &'a BTreeMap<String, u32>,
    /// Accepted source encounters.
    pub encounters: &'a [RawEncounter],
    /// Source rows rejected by the loader.
    pub rows_rejected: usize,
    /// Encounters of patients excluded for an unknown site.
    pub excluded_encounters: usize,
    pub subjects: &'a [Subject],
    pub adverse_events: &'a [AdverseEvent],
    /// Patients excluded for an unknown site.
    pub unassigned_patients: usize,
}

/// Compute the site, safety and quality tables.
pub fn aggregate(input: &AggregateInput<'_>) -> MetricTables {
    let span = info_span!("aggregate");
    let _guard = span.enter();

    let site_metrics = site_metrics(input.targets, input.subjects, input.adverse_events);
    let safety_metrics = safety_metrics(&site_metrics, input.adverse_events);
    let quality_metrics = vec![
        quality_row(
            RecordType::Encounter,
            input.encounters.iter().map(|encounter| RecordQuality {
                validity: Validity::Valid,
                fields_present: encounter.fields_present(),
                fields_required: RawEncounter::REQUIRED_FIELDS,
            }),
            input.rows_rejected,
            input.excluded_encounters,
        ),
        quality_row(
            RecordType::Subject,
            input.subjects.iter().map(|subject| RecordQuality {
                validity: subject.validity,
                fields_present: subject.fields_present(),
                fields_required: Subject::REQUIRED_FIELDS,
            }),
            0,
            input.unassigned_patients,
        ),
        quality_row(
            RecordType::AdverseEvent,
            input.adverse_events.iter().map(|event| RecordQuality {
                validity: event.validity,
                fields_present: event.fields_present(),
                fields_required: AdverseEvent::REQUIRED_FIELDS,
            }),
            0,
            0,
        ),
    ];

    let tables = MetricTables {
        site_metrics,
        safety_metrics,
        quality_metrics,
    };
    info!(
        sites = tables.site_metrics.len(),
        safety_rows = tables.safety_metrics.len(),
        enrolled = tables.total_enrolled(),
        "aggregated metrics"
    );
    tables
}
