use anyhow::{Context, Result};
use rbm_cli::pipeline::{RunOptions, load_config, run_pipeline};
use rbm_store::Snapshot;
use tracing::info;

use crate::cli::{ConfigArgs, RunArgs, ShowArgs};
use crate::summary::{print_run, print_snapshot};

pub fn run_pipeline_command(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref()).context("load configuration")?;
    if let Some(study_id) = &args.study_id {
        config.study_id.clone_from(study_id);
        config.validate().context("validate configuration")?;
    }
    info!(
        source = %args.source.display(),
        store = %args.store.display(),
        dry_run = args.dry_run,
        "starting pipeline run"
    );
    let options = RunOptions {
        source: args.source.clone(),
        store: args.store.clone(),
        dry_run: args.dry_run,
    };
    let result = run_pipeline(&config, &options)
        .with_context(|| format!("pipeline run over {}", args.source.display()))?;
    print_run(&result);
    Ok(())
}

pub fn run_show(args: &ShowArgs) -> Result<()> {
    let snapshot = Snapshot::open_current(&args.store)
        .with_context(|| format!("open current snapshot in {}", args.store.display()))?;
    print_snapshot(&snapshot);
    Ok(())
}

pub fn run_config(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args.config.as_deref()).context("load configuration")?;
    let rendered = config.to_toml_string().context("render configuration")?;
    print!("{rendered}");
    Ok(())
}
