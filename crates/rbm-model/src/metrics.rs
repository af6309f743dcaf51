//! Aggregate metric rows read by the presentation layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::enums::{RecordType, Severity};

/// Period label of the all-time safety rows.
pub const ALL_PERIODS: &str = "ALL";

/// Enrollment performance of one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteMetric {
    pub site_id: String,
    /// Subjects that passed validation (valid or warning).
    pub enrolled: usize,
    /// All mapped subjects, including invalid ones.
    pub submitted: usize,
    pub target: u32,
    /// `enrolled / target` to four decimals, 0 when the target is 0.
    pub enrollment_rate: f64,
    /// Valid adverse events at the site.
    pub ae_count: usize,
    pub mean_age: Option<f64>,
    pub first_enrollment: Option<NaiveDate>,
    pub last_enrollment: Option<NaiveDate>,
}

/// Adverse event counts for one site, severity and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyMetric {
    pub site_id: String,
    pub severity: Severity,
    /// [`ALL_PERIODS`] or an onset month `YYYY-MM`.
    pub period: String,
    pub event_count: usize,
    pub subjects_with_event: usize,
    /// Events per 100 enrolled subjects at the site, 0 when none enrolled.
    pub rate_per_100: f64,
}

/// Data-quality indicators for one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetric {
    pub record_type: RecordType,
    pub total: usize,
    pub valid: usize,
    pub warning: usize,
    pub invalid: usize,
    /// Records that never reached this table (unparsable rows, patients
    /// at unknown sites).
    pub excluded: usize,
    pub completeness_pct: f64,
    pub compliance_pct: f64,
}

/// The three aggregate tables of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTables {
    pub site_metrics: Vec<SiteMetric>,
    pub safety_metrics: Vec<SafetyMetric>,
    pub quality_metrics: Vec<QualityMetric>,
}

impl MetricTables {
    pub fn total_enrolled(&self) -> usize {
        self.site_metrics.iter().map(|metric| metric.enrolled).sum()
    }

    pub fn site(&self, site_id: &str) -> Option<&SiteMetric> {
        self.site_metrics
            .iter()
            .find(|metric| metric.site_id == site_id)
    }

    pub fn quality(&self, record_type: RecordType) -> Option<&QualityMetric> {
        self.quality_metrics
            .iter()
            .find(|metric| metric.record_type == record_type)
    }

    /// All-time safety row for a site and severity.
    pub fn safety(&self, site_id: &str, severity: Severity) -> Option<&SafetyMetric> {
        self.safety_metrics.iter().find(|metric| {
            metric.site_id == site_id && metric.severity == severity && metric.period == ALL_PERIODS
        })
    }
}

/// Ratio helper shared by the aggregates: 0 when the denominator is 0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Round to two decimals so persisted tables are stable to read.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_ratio_handles_zero_denominator() {
        assert_eq!(safe_ratio(5.0, 0.0), 0.0);
        assert_eq!(safe_ratio(0.0, 0.0), 0.0);
        assert!((safe_ratio(1.0, 4.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round_to(7.0 / 30.0, 4), 0.2333);
    }
}
