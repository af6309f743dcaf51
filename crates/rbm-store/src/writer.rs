//! Snapshot publishing.
//!
//! Tables are written into `staging/<run id>`, synced, moved into
//! `snapshots/<run id>`, and only then is `CURRENT` replaced through a
//! temp file and rename. A failure at any step leaves `CURRENT` untouched.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rbm_model::{AdverseEvent, DemographicsRecord, MetricTables, Subject, ValidationFinding};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::hash::{combined_digest, sha256_hex};
use crate::manifest::{MANIFEST_FILE, RunSummary, SCHEMA_VERSION, SnapshotManifest, TableEntry};
use crate::tables::{
    ADVERSE_EVENT_COLUMNS, DEMOGRAPHICS_COLUMNS, FINDING_COLUMNS, QUALITY_METRIC_COLUMNS,
    SAFETY_METRIC_COLUMNS, SITE_METRIC_COLUMNS, SUBJECT_COLUMNS, Table, encode,
};

pub const CURRENT_FILE: &str = "CURRENT";
pub const SNAPSHOTS_DIR: &str = "snapshots";
pub const STAGING_DIR: &str = "staging";

/// Everything persisted for one run.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotContents<'a> {
    pub subjects: &'a [Subject],
    pub adverse_events: &'a [AdverseEvent],
    pub findings: &'a [ValidationFinding],
    pub metrics: &'a MetricTables,
    pub demographics: &'a [DemographicsRecord],
    pub summary: &'a RunSummary,
}

/// Where and under which id a snapshot was published.
#[derive(Debug, Clone)]
pub struct PublishedSnapshot {
    pub run_id: String,
    pub path: PathBuf,
    pub manifest: SnapshotManifest,
    /// Snapshot directories removed by retention. Pruning is best effort;
    /// a directory that cannot be removed is logged and kept.
    pub pruned: Vec<String>,
}

/// Publishes snapshots under a store root.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    root: PathBuf,
    retain: usize,
}

impl SnapshotWriter {
    /// `retain` is the number of snapshots kept, including the current one;
    /// values below 1 are treated as 1.
    pub fn new(root: impl Into<PathBuf>, retain: usize) -> Self {
        Self {
            root: root.into(),
            retain: retain.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encode every table without touching the filesystem.
    pub fn encode_tables(contents: &SnapshotContents<'_>) -> Result<Vec<(Table, Vec<u8>, usize)>> {
        let metrics = contents.metrics;
        Ok(vec![
            (
                Table::Subjects,
                encode(Table::Subjects, contents.subjects, SUBJECT_COLUMNS)?,
                contents.subjects.len(),
            ),
            (
                Table::AdverseEvents,
                encode(
                    Table::AdverseEvents,
                    contents.adverse_events,
                    ADVERSE_EVENT_COLUMNS,
                )?,
                contents.adverse_events.len(),
            ),
            (
                Table::ValidationFindings,
                encode(Table::ValidationFindings, contents.findings, FINDING_COLUMNS)?,
                contents.findings.len(),
            ),
            (
                Table::SiteMetrics,
                encode(Table::SiteMetrics, &metrics.site_metrics, SITE_METRIC_COLUMNS)?,
                metrics.site_metrics.len(),
            ),
            (
                Table::SafetyMetrics,
                encode(
                    Table::SafetyMetrics,
                    &metrics.safety_metrics,
                    SAFETY_METRIC_COLUMNS,
                )?,
                metrics.safety_metrics.len(),
            ),
            (
                Table::QualityMetrics,
                encode(
                    Table::QualityMetrics,
                    &metrics.quality_metrics,
                    QUALITY_METRIC_COLUMNS,
                )?,
                metrics.quality_metrics.len(),
            ),
            (
                Table::Demographics,
                encode(
                    Table::Demographics,
                    contents.demographics,
                    DEMOGRAPHICS_COLUMNS,
                )?,
                contents.demographics.len(),
            ),
        ])
    }

    /// Write a new snapshot and make it current.
    pub fn publish(&self, contents: &SnapshotContents<'_>) -> Result<PublishedSnapshot> {
        let created_at = Utc::now();
        let encoded = Self::encode_tables(contents)?;
        let digest = combined_digest(
            encoded
                .iter()
                .map(|(table, bytes, _)| (table.as_str(), bytes.as_slice())),
        );
        let run_id = self.unique_run_id(created_at, &digest);

        let staging_root = self.root.join(STAGING_DIR);
        clear_stale_staging(&staging_root)?;
        let staging = staging_root.join(&run_id);
        fs::create_dir_all(&staging)
            .map_err(|e| StoreError::io("create directory", &staging, e))?;

        let mut tables = Vec::with_capacity(encoded.len());
        for (table, bytes, rows) in &encoded {
            let file = table.file_name();
            write_synced(&staging.join(&file), bytes)?;
            debug!(table = %table, rows, "wrote table");
            tables.push(TableEntry {
                name: table.as_str().to_string(),
                file,
                rows: *rows,
                sha256: sha256_hex(bytes),
            });
        }

        let manifest = SnapshotManifest {
            schema_version: SCHEMA_VERSION,
            run_id: run_id.clone(),
            created_at,
            summary: contents.summary.clone(),
            tables,
        };
        let manifest_path = staging.join(MANIFEST_FILE);
        let manifest_bytes = serde_json::to_vec_pretty(&manifest).map_err(|source| {
            StoreError::Manifest {
                path: manifest_path.clone(),
                source,
            }
        })?;
        write_synced(&manifest_path, &manifest_bytes)?;
        sync_dir(&staging);

        let snapshots = self.root.join(SNAPSHOTS_DIR);
        fs::create_dir_all(&snapshots)
            .map_err(|e| StoreError::io("create directory", &snapshots, e))?;
        let target = snapshots.join(&run_id);
        fs::rename(&staging, &target).map_err(|source| StoreError::AtomicSwapFailed {
            temp_path: staging.clone(),
            target_path: target.clone(),
            source,
        })?;
        sync_dir(&snapshots);

        self.swap_current(&run_id)?;
        info!(run_id = %run_id, path = %target.display(), "published snapshot");

        // CURRENT already names run_id; prune errors are logged, not returned
        let pruned = self.prune(&run_id);
        Ok(PublishedSnapshot {
            run_id,
            path: target,
            manifest,
            pruned,
        })
    }

    /// Point `CURRENT` at a run id with a single rename.
    fn swap_current(&self, run_id: &str) -> Result<()> {
        let current = self.root.join(CURRENT_FILE);
        let temp = self.root.join(format!("{CURRENT_FILE}.tmp"));
        write_synced(&temp, format!("{run_id}\n").as_bytes())?;
        fs::rename(&temp, &current).map_err(|source| StoreError::AtomicSwapFailed {
            temp_path: temp.clone(),
            target_path: current.clone(),
            source,
        })?;
        sync_dir(&self.root);
        Ok(())
    }

    /// Run ids sort by creation time; a suffix keeps them unique when two
    /// runs land in the same microsecond.
    fn unique_run_id(&self, created_at: DateTime<Utc>, digest: &str) -> String {
        let base = format!(
            "{}-{}",
            created_at.format("%Y%m%dT%H%M%S%6fZ"),
            &digest[..12]
        );
        let snapshots = self.root.join(SNAPSHOTS_DIR);
        let mut candidate = base.clone();
        let mut n = 1;
        while snapshots.join(&candidate).exists() {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        candidate
    }

    /// Remove the oldest snapshots beyond the retention count. The current
    /// snapshot is never removed.
    fn prune(&self, current: &str) -> Vec<String> {
        self.prune_with(current, |path: &Path| fs::remove_dir_all(path))
    }

    fn prune_with(&self, current: &str, remove: impl Fn(&Path) -> io::Result<()>) -> Vec<String> {
        let mut ids = match list_snapshots(&self.root) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "cannot list snapshots; nothing pruned");
                return Vec::new();
            }
        };
        if ids.len() <= self.retain {
            return Vec::new();
        }
        ids.retain(|id| id != current);
        let excess = ids.len() + 1 - self.retain;
        let mut pruned = Vec::with_capacity(excess);
        for id in ids.into_iter().take(excess) {
            let path = self.root.join(SNAPSHOTS_DIR).join(&id);
            match remove(&path) {
                Ok(()) => {
                    debug!(run_id = %id, "pruned snapshot");
                    pruned.push(id);
                }
                Err(err) => {
                    warn!(
                        run_id = %id,
                        path = %path.display(),
                        error = %err,
                        "failed to prune snapshot"
                    );
                }
            }
        }
        pruned
    }
}

/// Published run ids under a store root, oldest first.
pub fn list_snapshots(root: &Path) -> Result<Vec<String>> {
    let snapshots = root.join(SNAPSHOTS_DIR);
    if !snapshots.is_dir() {
        return Ok(Vec::new());
    }
    let entries =
        fs::read_dir(&snapshots).map_err(|e| StoreError::io("read directory", &snapshots, e))?;
    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io("read directory", &snapshots, e))?;
        if entry.path().is_dir() {
            ids.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    ids.sort_by(|a, b| run_id_order(a).cmp(&run_id_order(b)));
    Ok(ids)
}

/// Sort key for run ids: timestamp and digest, then numeric suffix.
fn run_id_order(id: &str) -> (&str, u32) {
    match id.split_once('.') {
        Some((base, suffix)) => (base, suffix.parse().unwrap_or(u32::MAX)),
        None => (id, 0),
    }
}

fn clear_stale_staging(staging_root: &Path) -> Result<()> {
    if !staging_root.is_dir() {
        return Ok(());
    }
    let entries = fs::read_dir(staging_root)
        .map_err(|e| StoreError::io("read directory", staging_root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io("read directory", staging_root, e))?;
        let path = entry.path();
        warn!(path = %path.display(), "removing stale staging directory");
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| StoreError::io("remove", &path, e))?;
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| StoreError::io("create", path, e))?;
    file.write_all(bytes)
        .map_err(|e| StoreError::io("write", path, e))?;
    file.sync_all().map_err(|e| StoreError::io("sync", path, e))?;
    Ok(())
}

/// Flush directory entries. Not every platform can open a directory for
/// syncing, so failures are only logged.
fn sync_dir(path: &Path) {
    if let Err(error) = File::open(path).and_then(|dir| dir.sync_all()) {
        debug!(path = %path.display(), %error, "directory sync unavailable");
    }
}
