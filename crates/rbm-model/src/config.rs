//! Pipeline configuration.
//!
//! Every option has a default so the pipeline runs unconfigured on the
//! reference dataset. A TOML file may override any subset of fields.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encounter::ClinicalField;
use crate::enums::Severity;

/// Errors raised while loading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Prefix of derived subject identifiers.
    pub study_id: String,
    /// The enumerated set of valid site identifiers.
    pub sites: Vec<String>,
    /// Care unit code (upper-cased) to site identifier.
    pub unit_to_site_map: BTreeMap<String, String>,
    /// Ordered trigger rules; each firing yields one adverse event.
    pub severity_trigger_rules: Vec<TriggerRule>,
    /// Explicit per-site enrollment targets. Sites not listed share the
    /// remainder of `total_enrollment_target` equally.
    pub enrollment_targets: BTreeMap<String, u32>,
    pub total_enrollment_target: u32,
    /// Width in years of each age band.
    pub age_band_width: u32,
    /// Treatment arms, assigned in turn within each site.
    pub treatment_arms: Vec<String>,
    pub source_schema: SourceSchema,
    pub validation: ValidationOptions,
    pub store: StoreOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let unit_to_site_map: BTreeMap<String, String> = DEFAULT_UNIT_SITES
            .iter()
            .map(|(unit, site)| ((*unit).to_string(), (*site).to_string()))
            .collect();
        let sites = DEFAULT_UNIT_SITES
            .iter()
            .map(|(_, site)| (*site).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            study_id: "ICU-RBM".to_string(),
            sites,
            unit_to_site_map,
            severity_trigger_rules: default_trigger_rules(),
            enrollment_targets: BTreeMap::new(),
            total_enrollment_target: 100,
            age_band_width: 10,
            treatment_arms: vec!["Active".to_string(), "Control".to_string()],
            source_schema: SourceSchema::default(),
            validation: ValidationOptions::default(),
            store: StoreOptions::default(),
        }
    }
}

/// MIMIC-III care units and the trial sites they feed.
const DEFAULT_UNIT_SITES: &[(&str, &str)] = &[
    ("MICU", "SITE-01"),
    ("SICU", "SITE-02"),
    ("CCU", "SITE-03"),
    ("CSRU", "SITE-04"),
    ("TSICU", "SITE-05"),
];

impl PipelineConfig {
    /// Load a TOML config file; missing fields take their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check structural constraints that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.study_id.trim().is_empty() {
            return Err(ConfigError::invalid("study_id must not be empty"));
        }
        if self.sites.is_empty() {
            return Err(ConfigError::invalid("at least one site is required"));
        }
        if self.age_band_width == 0 {
            return Err(ConfigError::invalid("age_band_width must be positive"));
        }
        if self.treatment_arms.is_empty() {
            return Err(ConfigError::invalid("at least one treatment arm is required"));
        }
        let mut arm_codes = BTreeSet::new();
        for arm in &self.treatment_arms {
            let code = crate::demographics::arm_code(arm);
            if code.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "treatment arm {arm:?} has no alphanumeric characters"
                )));
            }
            if !arm_codes.insert(code) {
                return Err(ConfigError::invalid(format!(
                    "treatment arm {arm:?} duplicates another arm code"
                )));
            }
        }
        let sites: BTreeSet<&str> = self.sites.iter().map(String::as_str).collect();
        if sites.len() != self.sites.len() {
            return Err(ConfigError::invalid("sites must be unique"));
        }
        for site in self.enrollment_targets.keys() {
            if !sites.contains(site.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "enrollment target given for unknown site {site}"
                )));
            }
        }
        let mut trigger_ids = BTreeSet::new();
        for rule in &self.severity_trigger_rules {
            if rule.id.trim().is_empty() {
                return Err(ConfigError::invalid("trigger rule id must not be empty"));
            }
            if !trigger_ids.insert(rule.id.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate trigger rule id {}",
                    rule.id
                )));
            }
            if let TriggerPredicate::OutsideRange { low, high, .. } = rule.predicate
                && low > high
            {
                return Err(ConfigError::invalid(format!(
                    "trigger {} has low bound above high bound",
                    rule.id
                )));
            }
        }
        if self.validation.age_min > self.validation.age_max {
            return Err(ConfigError::invalid("validation.age_min exceeds age_max"));
        }
        Ok(())
    }

    /// Site for a care unit, matched case-insensitively.
    pub fn site_for_unit(&self, unit: &str) -> Option<&str> {
        self.unit_to_site_map
            .get(&unit.trim().to_ascii_uppercase())
            .or_else(|| self.unit_to_site_map.get(unit.trim()))
            .map(String::as_str)
    }

    /// Enrollment target per configured site.
    ///
    /// Explicit targets win; the remaining total is split equally over the
    /// other sites in sorted order, with the remainder going to the first.
    pub fn site_targets(&self) -> BTreeMap<String, u32> {
        let mut targets = BTreeMap::new();
        let mut implicit: Vec<&String> = Vec::new();
        let mut claimed = 0u32;
        let mut ordered: Vec<&String> = self.sites.iter().collect();
        ordered.sort();
        for site in ordered {
            match self.enrollment_targets.get(site) {
                Some(target) => {
                    claimed = claimed.saturating_add(*target);
                    targets.insert(site.clone(), *target);
                }
                None => implicit.push(site),
            }
        }
        if implicit.is_empty() {
            return targets;
        }
        let remaining = self.total_enrollment_target.saturating_sub(claimed);
        let count = implicit.len() as u32;
        let share = remaining / count;
        let extra = remaining % count;
        for (idx, site) in implicit.into_iter().enumerate() {
            let bonus = u32::from((idx as u32) < extra);
            targets.insert(site.clone(), share + bonus);
        }
        targets
    }
}

/// One predicate → severity rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub id: String,
    /// Adverse event term recorded when the rule fires.
    pub term: String,
    /// Severity code; must resolve in the fixed severity order or the
    /// resulting events fail validation.
    pub severity: String,
    #[serde(default)]
    pub related: bool,
    pub predicate: TriggerPredicate,
}

/// Condition evaluated against one encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerPredicate {
    /// Field value strictly above `value`.
    Above { field: ClinicalField, value: f64 },
    /// Field value strictly below `value`.
    Below { field: ClinicalField, value: f64 },
    /// Field value outside the inclusive reference range.
    OutsideRange {
        field: ClinicalField,
        low: f64,
        high: f64,
    },
    /// Any diagnosis code matches the regular expression.
    Diagnosis { pattern: String },
}

fn trigger_rule(
    id: &str,
    term: &str,
    severity: Severity,
    predicate: TriggerPredicate,
) -> TriggerRule {
    TriggerRule {
        id: id.to_string(),
        term: term.to_string(),
        severity: severity.as_str().to_string(),
        related: false,
        predicate,
    }
}

/// Default trigger table for MIMIC-style vitals, labs and ICD-9 codes.
pub fn default_trigger_rules() -> Vec<TriggerRule> {
    use ClinicalField::{Creatinine, HeartRate, Lactate, Spo2, SystolicBp, Temperature};
    use TriggerPredicate::{Above, Below, Diagnosis, OutsideRange};

    vec![
        trigger_rule(
            "T01",
            "Tachycardia",
            Severity::Moderate,
            Above {
                field: HeartRate,
                value: 130.0,
            },
        ),
        trigger_rule(
            "T02",
            "Bradycardia",
            Severity::Severe,
            Below {
                field: HeartRate,
                value: 40.0,
            },
        ),
        trigger_rule(
            "T03",
            "Hypotension",
            Severity::Moderate,
            Below {
                field: SystolicBp,
                value: 90.0,
            },
        ),
        trigger_rule(
            "T04",
            "Shock",
            Severity::LifeThreatening,
            Below {
                field: SystolicBp,
                value: 70.0,
            },
        ),
        trigger_rule(
            "T05",
            "Hypoxaemia",
            Severity::Severe,
            Below {
                field: Spo2,
                value: 88.0,
            },
        ),
        trigger_rule(
            "T06",
            "Pyrexia",
            Severity::Mild,
            Above {
                field: Temperature,
                value: 38.5,
            },
        ),
        trigger_rule(
            "T07",
            "Hypothermia",
            Severity::Moderate,
            Below {
                field: Temperature,
                value: 35.0,
            },
        ),
        trigger_rule(
            "T08",
            "Hyperlactataemia",
            Severity::Severe,
            Above {
                field: Lactate,
                value: 4.0,
            },
        ),
        trigger_rule(
            "T09",
            "Abnormal creatinine",
            Severity::Mild,
            OutsideRange {
                field: Creatinine,
                low: 0.5,
                high: 1.5,
            },
        ),
        trigger_rule(
            "T10",
            "Sepsis",
            Severity::Severe,
            Diagnosis {
                pattern: r"^995\.9[12]$".to_string(),
            },
        ),
        trigger_rule(
            "T11",
            "Acute respiratory failure",
            Severity::LifeThreatening,
            Diagnosis {
                pattern: r"^518\.8[1-4]$".to_string(),
            },
        ),
        trigger_rule(
            "T12",
            "Acute kidney failure",
            Severity::Severe,
            Diagnosis {
                pattern: r"^584(\.\d)?$".to_string(),
            },
        ),
    ]
}

/// Column names of the source dataset, per logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSchema {
    pub patient_id: String,
    pub encounter_id: String,
    pub admit_time: String,
    pub discharge_time: String,
    pub age: String,
    pub sex: String,
    pub care_unit: String,
    pub diagnosis_codes: String,
    pub heart_rate: String,
    pub systolic_bp: String,
    pub spo2: String,
    pub temperature: String,
    pub lactate: String,
    pub creatinine: String,
    pub event_time: String,
    pub expire_flag: String,
}

impl Default for SourceSchema {
    fn default() -> Self {
        Self {
            patient_id: "subject_id".to_string(),
            encounter_id: "hadm_id".to_string(),
            admit_time: "admittime".to_string(),
            discharge_time: "dischtime".to_string(),
            age: "age".to_string(),
            sex: "gender".to_string(),
            care_unit: "first_careunit".to_string(),
            diagnosis_codes: "icd9_codes".to_string(),
            heart_rate: "heart_rate".to_string(),
            systolic_bp: "sys_bp".to_string(),
            spo2: "spo2".to_string(),
            temperature: "temp_c".to_string(),
            lactate: "lactate".to_string(),
            creatinine: "creatinine".to_string(),
            event_time: "charttime".to_string(),
            expire_flag: "hospital_expire_flag".to_string(),
        }
    }
}

impl SourceSchema {
    /// Columns that must be present in the source header.
    pub fn required_columns(&self) -> [&str; 6] {
        [
            self.patient_id.as_str(),
            self.encounter_id.as_str(),
            self.admit_time.as_str(),
            self.age.as_str(),
            self.sex.as_str(),
            self.care_unit.as_str(),
        ]
    }
}

/// Bounds used by the validation rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationOptions {
    pub age_min: f64,
    pub age_max: f64,
    /// Subjects younger than this raise a warning.
    pub adult_age: f64,
    /// Ages above this are de-identified in the source and raise a warning.
    pub deidentified_age: f64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            age_min: 0.0,
            age_max: 120.0,
            adult_age: 18.0,
            deidentified_age: 89.0,
        }
    }
}

/// Snapshot store behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreOptions {
    /// Number of published snapshots kept on disk, including the current one.
    pub retain: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { retain: 3 }
    }
}
