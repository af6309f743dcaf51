//! Pipeline orchestration: load → map → validate → aggregate → publish.
//!
//! The DM export is derived after validation so that only countable
//! subjects are allocated to arms.
//!
//! [`transform`] is the pure middle of the run and is what the idempotence
//! tests exercise; [`run_pipeline`] adds the source file and the store.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rbm_ingest::{IngestError, LoadedSource, load_encounters};
use rbm_map::{DomainMapper, MapError, demographics};
use rbm_metrics::{AggregateInput, aggregate};
use rbm_model::{
    AdverseEvent, ConfigError, DemographicsRecord, FindingReport, MetricTables, PipelineConfig,
    Subject,
};
use rbm_store::{
    PublishedSnapshot, RunSummary, SnapshotContents, SnapshotWriter, StoreError,
};
use rbm_validate::ValidationEngine;
use thiserror::Error;
use tracing::{info, info_span, trace};

use crate::logging::redact_value;

/// Fatal pipeline errors. Per-record problems never surface here; they are
/// findings in the published snapshot.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Map(#[from] MapError),

    /// Publishing failed; the previous snapshot is still current.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Where to read from and write to.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: PathBuf,
    pub store: PathBuf,
    /// Run every stage but do not publish.
    pub dry_run: bool,
}

/// Everything one run produces before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub subjects: Vec<Subject>,
    pub adverse_events: Vec<AdverseEvent>,
    pub report: FindingReport,
    pub metrics: MetricTables,
    /// SDTM DM export of the countable subjects.
    pub demographics: Vec<DemographicsRecord>,
    pub summary: RunSummary,
}

impl PipelineOutput {
    pub fn contents(&self) -> SnapshotContents<'_> {
        SnapshotContents {
            subjects: &self.subjects,
            adverse_events: &self.adverse_events,
            findings: &self.report.findings,
            metrics: &self.metrics,
            demographics: &self.demographics,
            summary: &self.summary,
        }
    }
}

/// Result of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct RunResult {
    pub output: PipelineOutput,
    /// `None` for a dry run.
    pub published: Option<PublishedSnapshot>,
}

/// Read the configuration file, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    Ok(config)
}

/// Map, validate and aggregate loaded encounters.
pub fn transform(config: &PipelineConfig, loaded: &LoadedSource) -> Result<PipelineOutput> {
    let mapper = DomainMapper::new(config)?;
    let mapped = mapper.map(&loaded.encounters);

    let mut prior_findings = loaded.validation_findings();
    prior_findings.extend(mapped.findings);
    let validated = ValidationEngine::new(&config.validation, &config.sites).validate(
        mapped.subjects,
        mapped.adverse_events,
        prior_findings,
    );

    let targets = config.site_targets();
    let metrics = aggregate(&AggregateInput {
        targets: &targets,
        encounters: &loaded.encounters,
        rows_rejected: loaded.rows_rejected(),
        excluded_encounters: mapped.excluded_encounters,
        subjects: &validated.subjects,
        adverse_events: &validated.adverse_events,
        unassigned_patients: mapped.unassigned_patients,
    });

    let dm_rows = demographics(config, &validated.subjects);

    let summary = RunSummary {
        study_id: config.study_id.clone(),
        rows_read: loaded.rows_read,
        rows_rejected: loaded.rows_rejected(),
        subjects: validated.subjects.len(),
        adverse_events: validated.adverse_events.len(),
        unassigned_patients: mapped.unassigned_patients,
        findings: validated.report.findings.len(),
        failures: validated.report.failure_count(),
        warnings: validated.report.warning_count(),
        quality_score: validated.quality_score,
    };

    Ok(PipelineOutput {
        subjects: validated.subjects,
        adverse_events: validated.adverse_events,
        report: validated.report,
        metrics,
        demographics: dm_rows,
        summary,
    })
}

/// Run every stage and publish the snapshot unless this is a dry run.
pub fn run_pipeline(config: &PipelineConfig, options: &RunOptions) -> Result<RunResult> {
    let span = info_span!("pipeline", study_id = %config.study_id);
    let _guard = span.enter();

    let start = Instant::now();
    let loaded = load_encounters(&options.source, &config.source_schema)?;
    for finding in &loaded.findings {
        trace!(
            row = finding.row,
            column = %finding.column,
            value = redact_value(&finding.value),
            "rejected cell"
        );
    }
    info!(
        rows = loaded.rows_read,
        elapsed_ms = start.elapsed().as_millis(),
        "load stage complete"
    );

    let start = Instant::now();
    let output = transform(config, &loaded)?;
    info!(
        subjects = output.summary.subjects,
        adverse_events = output.summary.adverse_events,
        findings = output.summary.findings,
        quality_score = output.summary.quality_score,
        elapsed_ms = start.elapsed().as_millis(),
        "transform stages complete"
    );

    if options.dry_run {
        info!("dry run; snapshot not published");
        return Ok(RunResult {
            output,
            published: None,
        });
    }

    let start = Instant::now();
    let writer = SnapshotWriter::new(&options.store, config.store.retain);
    let published = writer.publish(&output.contents())?;
    info!(
        run_id = %published.run_id,
        pruned = published.pruned.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "publish stage complete"
    );

    Ok(RunResult {
        output,
        published: Some(published),
    })
}
