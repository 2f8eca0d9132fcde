//! Command-line arguments

use clap::{Parser, ValueEnum};
use pitchline_core::CampaignId;
use std::path::PathBuf;

/// Run the research, generate, score and refine pipeline for one customer.
#[derive(Debug, Parser)]
#[command(name = "pitchline", version, about)]
pub struct Cli {
    /// Customer profile as a JSON file. A missing `customer_id` gets a fresh one.
    #[arg(long, value_name = "FILE")]
    pub customer: PathBuf,

    /// Campaign the run is attributed to.
    #[arg(long, value_name = "UUID")]
    pub campaign: Option<CampaignId>,

    /// TOML settings file. Falls back to `PITCHLINE_CONFIG`, then to the environment.
    #[arg(long, value_name = "FILE", env = "PITCHLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override `orchestrator.score_threshold`.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Override `orchestrator.max_refinements`.
    #[arg(long)]
    pub max_refinements: Option<u32>,

    /// Run once, without whole-run retries.
    #[arg(long)]
    pub no_retry: bool,

    /// Log output format.
    #[arg(long, value_enum, env = "PITCHLINE_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}
