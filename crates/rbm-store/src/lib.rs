//! Snapshot store for monitoring runs.
//!
//! Each run is persisted as a directory of CSV tables plus a
//! `manifest.json` carrying per-table SHA-256 checksums. A `CURRENT` file
//! names the published snapshot and is replaced with a single rename, so
//! readers see either the previous snapshot or the new one.
//!
//! ```text
//! <root>/
//!   CURRENT
//!   snapshots/<run id>/manifest.json
//!   snapshots/<run id>/subjects.csv ...
//!   staging/
//! ```

mod error;
mod hash;
mod manifest;
mod reader;
mod tables;
mod writer;

pub use error::{Result, StoreError};
pub use hash::{combined_digest, sha256_hex};
pub use manifest::{MANIFEST_FILE, RunSummary, SCHEMA_VERSION, SnapshotManifest, TableEntry};
pub use reader::{Snapshot, current_run_id};
pub use tables::Table;
pub use writer::{
    CURRENT_FILE, PublishedSnapshot, SNAPSHOTS_DIR, STAGING_DIR, SnapshotContents, SnapshotWriter,
    list_snapshots,
};
