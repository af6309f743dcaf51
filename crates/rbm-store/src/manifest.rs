//! Snapshot manifest: run metadata and per-table checksums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Manifest file name inside a snapshot directory.
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub tables: Vec<TableEntry>,
}

impl SnapshotManifest {
    pub fn table(&self, name: &str) -> Option<&TableEntry> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// One persisted table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub file: String,
    pub rows: usize,
    pub sha256: String,
}

/// Headline counts of the run that produced a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub study_id: String,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub subjects: usize,
    pub adverse_events: usize,
    pub unassigned_patients: usize,
    pub findings: usize,
    pub failures: usize,
    pub warnings: usize,
    pub quality_score: f64,
}
