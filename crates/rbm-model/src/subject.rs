//! Trial-domain subject demographics.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::enums::{SubjectStatus, Validity};

/// Fixed-width age bucket, e.g. `40-49` for width 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgeBand {
    pub lower: u32,
    pub upper: u32,
}

impl AgeBand {
    /// Bucket an age in years into a band of `width` years.
    ///
    /// Returns `None` for a zero width, a negative/non-finite age, or an age
    /// whose band does not fit in `u32`.
    pub fn for_age(age: f64, width: u32) -> Option<Self> {
        if width == 0 || !age.is_finite() || age < 0.0 {
            return None;
        }
        let years = age.floor();
        if years > f64::from(u32::MAX) {
            return None;
        }
        let years = years as u32;
        let lower = (years / width) * width;
        let upper = lower.checked_add(width - 1)?;
        Some(Self { lower, upper })
    }

    pub fn contains(&self, age: f64) -> bool {
        age >= f64::from(self.lower) && age < f64::from(self.upper) + 1.0
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

impl FromStr for AgeBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lower, upper) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("invalid age band: {s}"))?;
        let lower = lower
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid age band: {s}"))?;
        let upper = upper
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid age band: {s}"))?;
        if upper < lower {
            return Err(format!("invalid age band: {s}"));
        }
        Ok(Self { lower, upper })
    }
}

// Bands are stored as their display form so snapshot tables stay flat.
impl Serialize for AgeBand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AgeBand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A trial participant derived from one patient's encounter history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: String,
    pub patient_id: String,
    pub site_id: String,
    pub enrollment_date: NaiveDate,
    pub age: Option<f64>,
    pub age_band: Option<AgeBand>,
    /// Coded sex (`M`, `F`, `U`), or the upper-cased source value when the
    /// source used an unrecognised code.
    pub sex: Option<String>,
    pub status: SubjectStatus,
    /// Number of source encounters folded into this subject.
    pub encounter_count: usize,
    pub validity: Validity,
}

impl Subject {
    /// Required fields that are populated, out of [`Subject::REQUIRED_FIELDS`].
    pub fn fields_present(&self) -> usize {
        // enrollment_date and status are always derived
        let mut present = 2;
        if !self.site_id.trim().is_empty() {
            present += 1;
        }
        if self.age.is_some() {
            present += 1;
        }
        if self.sex.as_deref().is_some_and(|sex| !sex.trim().is_empty()) {
            present += 1;
        }
        present
    }

    pub const REQUIRED_FIELDS: usize = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_band_buckets_by_width() {
        let band = AgeBand::for_age(47.9, 10).unwrap();
        assert_eq!(band.to_string(), "40-49");
        assert!(band.contains(47.9));
        assert!(!band.contains(50.0));

        let band = AgeBand::for_age(0.0, 5).unwrap();
        assert_eq!(band.to_string(), "0-4");
    }

    #[test]
    fn age_band_rejects_bad_input() {
        assert!(AgeBand::for_age(40.0, 0).is_none());
        assert!(AgeBand::for_age(-1.0, 10).is_none());
        assert!(AgeBand::for_age(f64::NAN, 10).is_none());
    }

    #[test]
    fn age_band_is_none_when_band_overflows() {
        assert!(AgeBand::for_age(1e10, 10).is_none());
        // lower bound fits, upper bound does not
        assert!(AgeBand::for_age(f64::from(u32::MAX), 10).is_none());

        let band = AgeBand::for_age(f64::from(u32::MAX), 1).unwrap();
        assert_eq!(band.upper, u32::MAX);
        assert!(band.contains(f64::from(u32::MAX) + 0.5));
    }

    #[test]
    fn age_band_parses_display_form() {
        let band: AgeBand = "60-69".parse().unwrap();
        assert_eq!(band, AgeBand { lower: 60, upper: 69 });
        assert!("69-60".parse::<AgeBand>().is_err());
        assert!("sixty".parse::<AgeBand>().is_err());
    }
}
