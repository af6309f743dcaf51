//! Reading the current snapshot with checksum verification and key indexes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rbm_model::{
    ALL_PERIODS, AdverseEvent, DemographicsRecord, MetricTables, QualityMetric, RecordType, SafetyMetric, Severity,
    SiteMetric, Subject, ValidationFinding,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::hash::sha256_hex;
use crate::manifest::{MANIFEST_FILE, SnapshotManifest};
use crate::tables::{Table, decode};
use crate::writer::{CURRENT_FILE, SNAPSHOTS_DIR};

/// Run id that `CURRENT` points at, if any snapshot was published.
pub fn current_run_id(root: &Path) -> Result<Option<String>> {
    let path = root.join(CURRENT_FILE);
    match fs::read_to_string(&path) {
        Ok(contents) => {
            let id = contents.trim();
            Ok((!id.is_empty()).then(|| id.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io("read", path, e)),
    }
}

/// A loaded, verified snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
    manifest: SnapshotManifest,
    subjects: Vec<Subject>,
    adverse_events: Vec<AdverseEvent>,
    findings: Vec<ValidationFinding>,
    metrics: MetricTables,
    demographics: Vec<DemographicsRecord>,
    subject_index: BTreeMap<String, usize>,
    events_by_subject: BTreeMap<String, Vec<usize>>,
    events_by_site: BTreeMap<String, Vec<usize>>,
    events_by_severity: BTreeMap<Severity, Vec<usize>>,
    site_index: BTreeMap<String, usize>,
    safety_index: BTreeMap<(String, Severity), Vec<usize>>,
    quality_index: BTreeMap<RecordType, usize>,
    findings_by_target: BTreeMap<(RecordType, String), Vec<usize>>,
}

impl Snapshot {
    /// Open the snapshot `CURRENT` points at.
    pub fn open_current(root: &Path) -> Result<Self> {
        let run_id = current_run_id(root)?.ok_or_else(|| StoreError::NoSnapshot {
            root: root.to_path_buf(),
        })?;
        Self::open(&root.join(SNAPSHOTS_DIR).join(run_id))
    }

    /// Open a snapshot directory, verifying every table against the manifest.
    pub fn open(path: &Path) -> Result<Self> {
        let manifest_path = path.join(MANIFEST_FILE);
        let bytes =
            fs::read(&manifest_path).map_err(|e| StoreError::io("read", &manifest_path, e))?;
        let manifest: SnapshotManifest =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        let subjects: Vec<Subject> = read_table(path, &manifest, Table::Subjects)?;
        let adverse_events: Vec<AdverseEvent> = read_table(path, &manifest, Table::AdverseEvents)?;
        let findings: Vec<ValidationFinding> =
            read_table(path, &manifest, Table::ValidationFindings)?;
        let metrics = MetricTables {
            site_metrics: read_table(path, &manifest, Table::SiteMetrics)?,
            safety_metrics: read_table(path, &manifest, Table::SafetyMetrics)?,
            quality_metrics: read_table(path, &manifest, Table::QualityMetrics)?,
        };
        let demographics: Vec<DemographicsRecord> =
            read_table(path, &manifest, Table::Demographics)?;

        let mut snapshot = Self {
            path: path.to_path_buf(),
            manifest,
            subjects,
            adverse_events,
            findings,
            metrics,
            demographics,
            subject_index: BTreeMap::new(),
            events_by_subject: BTreeMap::new(),
            events_by_site: BTreeMap::new(),
            events_by_severity: BTreeMap::new(),
            site_index: BTreeMap::new(),
            safety_index: BTreeMap::new(),
            quality_index: BTreeMap::new(),
            findings_by_target: BTreeMap::new(),
        };
        snapshot.build_indexes();
        debug!(
            run_id = %snapshot.manifest.run_id,
            subjects = snapshot.subjects.len(),
            adverse_events = snapshot.adverse_events.len(),
            "opened snapshot"
        );
        Ok(snapshot)
    }

    fn build_indexes(&mut self) {
        for (idx, subject) in self.subjects.iter().enumerate() {
            self.subject_index.insert(subject.subject_id.clone(), idx);
        }
        for (idx, event) in self.adverse_events.iter().enumerate() {
            self.events_by_subject
                .entry(event.subject_id.clone())
                .or_default()
                .push(idx);
            self.events_by_site
                .entry(event.site_id.clone())
                .or_default()
                .push(idx);
            if let Some(severity) = event.severity {
                self.events_by_severity.entry(severity).or_default().push(idx);
            }
        }
        for (idx, metric) in self.metrics.site_metrics.iter().enumerate() {
            self.site_index.insert(metric.site_id.clone(), idx);
        }
        for (idx, metric) in self.metrics.safety_metrics.iter().enumerate() {
            self.safety_index
                .entry((metric.site_id.clone(), metric.severity))
                .or_default()
                .push(idx);
        }
        for (idx, metric) in self.metrics.quality_metrics.iter().enumerate() {
            self.quality_index.insert(metric.record_type, idx);
        }
        for (idx, finding) in self.findings.iter().enumerate() {
            self.findings_by_target
                .entry((finding.record_type, finding.record_id.clone()))
                .or_default()
                .push(idx);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &SnapshotManifest {
        &self.manifest
    }

    pub fn run_id(&self) -> &str {
        &self.manifest.run_id
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn adverse_events(&self) -> &[AdverseEvent] {
        &self.adverse_events
    }

    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    pub fn metrics(&self) -> &MetricTables {
        &self.metrics
    }

    /// SDTM DM rows, sorted by `USUBJID`.
    pub fn demographics(&self) -> &[DemographicsRecord] {
        &self.demographics
    }

    pub fn subject(&self, subject_id: &str) -> Option<&Subject> {
        self.subject_index
            .get(subject_id)
            .map(|idx| &self.subjects[*idx])
    }

    pub fn events_for_subject(&self, subject_id: &str) -> Vec<&AdverseEvent> {
        self.collect_events(self.events_by_subject.get(subject_id))
    }

    pub fn events_for_site(&self, site_id: &str) -> Vec<&AdverseEvent> {
        self.collect_events(self.events_by_site.get(site_id))
    }

    pub fn events_with_severity(&self, severity: Severity) -> Vec<&AdverseEvent> {
        self.collect_events(self.events_by_severity.get(&severity))
    }

    fn collect_events(&self, indexes: Option<&Vec<usize>>) -> Vec<&AdverseEvent> {
        indexes
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|idx| &self.adverse_events[*idx])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn site_metric(&self, site_id: &str) -> Option<&SiteMetric> {
        self.site_index
            .get(site_id)
            .map(|idx| &self.metrics.site_metrics[*idx])
    }

    /// All safety rows (all-time and monthly) for a site and severity.
    pub fn safety_rows(&self, site_id: &str, severity: Severity) -> Vec<&SafetyMetric> {
        self.safety_index
            .get(&(site_id.to_string(), severity))
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|idx| &self.metrics.safety_metrics[*idx])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The all-time safety row for a site and severity.
    pub fn safety(&self, site_id: &str, severity: Severity) -> Option<&SafetyMetric> {
        self.safety_rows(site_id, severity)
            .into_iter()
            .find(|metric| metric.period == ALL_PERIODS)
    }

    pub fn quality(&self, record_type: RecordType) -> Option<&QualityMetric> {
        self.quality_index
            .get(&record_type)
            .map(|idx| &self.metrics.quality_metrics[*idx])
    }

    pub fn findings_for(&self, record_type: RecordType, record_id: &str) -> Vec<&ValidationFinding> {
        self.findings_by_target
            .get(&(record_type, record_id.to_string()))
            .map(|indexes| indexes.iter().map(|idx| &self.findings[*idx]).collect())
            .unwrap_or_default()
    }
}

fn read_table<T: DeserializeOwned>(
    dir: &Path,
    manifest: &SnapshotManifest,
    table: Table,
) -> Result<Vec<T>> {
    let entry = manifest
        .table(table.as_str())
        .ok_or_else(|| StoreError::MissingTable {
            run_id: manifest.run_id.clone(),
            table: table.as_str(),
        })?;
    let path = dir.join(&entry.file);
    let bytes = fs::read(&path).map_err(|e| StoreError::io("read", &path, e))?;
    let actual = sha256_hex(&bytes);
    if actual != entry.sha256 {
        return Err(StoreError::ChecksumMismatch {
            table: entry.name.clone(),
            expected: entry.sha256.clone(),
            actual,
        });
    }
    decode(table, &bytes)
}
