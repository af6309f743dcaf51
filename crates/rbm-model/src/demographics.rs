//! CDISC SDTM Demographics (DM) rows derived from subjects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `DOMAIN` value of every DM row.
pub const DM_DOMAIN: &str = "DM";
/// `AGEU` value when an age is reported.
pub const AGE_UNIT_YEARS: &str = "YEARS";

/// One DM row. Field names serialize as the SDTM variable names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct DemographicsRecord {
    pub studyid: String,
    pub domain: String,
    /// Unique subject identifier; the derived subject id.
    pub usubjid: String,
    /// Subject identifier in the source system.
    pub subjid: String,
    pub siteid: String,
    /// Reference start date: the enrollment date.
    pub rfstdtc: NaiveDate,
    /// Age in completed years.
    pub age: Option<u32>,
    pub ageu: Option<String>,
    pub sex: Option<String>,
    pub armcd: String,
    pub arm: String,
}

/// Short arm code: upper-cased alphanumerics, at most 20 characters.
pub fn arm_code(arm: &str) -> String {
    arm.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(20)
        .collect()
}
