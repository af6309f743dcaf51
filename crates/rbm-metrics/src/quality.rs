//! Completeness and compliance per record type.

use rbm_model::metrics::{round2, safe_ratio};
use rbm_model::{QualityMetric, RecordType, Validity};

/// Validity and field completeness of one record, as input to a quality row.
#[derive(Debug, Clone, Copy)]
pub struct RecordQuality {
    pub validity: Validity,
    pub fields_present: usize,
    pub fields_required: usize,
}

/// Build one quality row.
///
/// `extra_invalid` counts records that failed before they could be
/// represented (unparsable rows); `excluded` counts records dropped before
/// reaching this table.
pub fn quality_row(
    record_type: RecordType,
    records: impl IntoIterator<Item = RecordQuality>,
    extra_invalid: usize,
    excluded: usize,
) -> QualityMetric {
    let mut valid = 0;
    let mut warning = 0;
    let mut invalid = extra_invalid;
    let mut completeness_sum = 0.0;
    let mut represented = 0usize;

    for record in records {
        match record.validity {
            Validity::Valid => valid += 1,
            Validity::Warning => warning += 1,
            Validity::Invalid => invalid += 1,
        }
        completeness_sum += safe_ratio(
            record.fields_present as f64,
            record.fields_required as f64,
        );
        represented += 1;
    }

    let total = valid + warning + invalid;
    QualityMetric {
        record_type,
        total,
        valid,
        warning,
        invalid,
        excluded,
        completeness_pct: round2(safe_ratio(completeness_sum, represented as f64) * 100.0),
        compliance_pct: round2(safe_ratio((valid + warning) as f64, total as f64) * 100.0),
    }
}
