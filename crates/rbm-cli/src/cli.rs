//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "rbm-pipeline",
    version,
    about = "ICU trial monitoring pipeline - build risk-based monitoring snapshots",
    long_about = "Reshape ICU encounter records into trial subjects and adverse events,\n\
                  validate them, aggregate site, safety and data-quality metrics, and\n\
                  publish the result as an atomically swapped snapshot."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient-level source values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the pipeline over a source CSV and publish a snapshot.
    Run(RunArgs),

    /// Print the summary of the current snapshot.
    Show(ShowArgs),

    /// Print the effective configuration as TOML.
    Config(ConfigArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Encounter CSV file.
    #[arg(value_name = "SOURCE_CSV")]
    pub source: PathBuf,

    /// Snapshot store root.
    #[arg(long = "store", value_name = "DIR", default_value = "rbm-store")]
    pub store: PathBuf,

    /// Pipeline configuration file (TOML).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the study identifier.
    #[arg(long = "study-id", value_name = "ID")]
    pub study_id: Option<String>,

    /// Run every stage without publishing a snapshot.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Snapshot store root.
    #[arg(long = "store", value_name = "DIR", default_value = "rbm-store")]
    pub store: PathBuf,
}

#[derive(Parser)]
pub struct ConfigArgs {
    /// Configuration file to load and validate instead of the defaults.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
