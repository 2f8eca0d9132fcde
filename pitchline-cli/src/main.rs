//! pitchline command-line runner
//!
//! Reads a customer profile, runs one pipeline against the configured chat
//! model and research tool, and prints the [`PipelineResult`] as JSON.
//!
//! [`PipelineResult`]: pitchline_agents::PipelineResult

mod cli;
mod run;
mod settings;
mod telemetry;

use clap::Parser;
use cli::Cli;
use settings::Settings;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_tracing(cli.log_format) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match start(&cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "pitchline run failed");
            ExitCode::FAILURE
        }
    }
}

async fn start(cli: &Cli) -> pitchline_core::PitchlineResult<String> {
    let settings = Settings::load(cli)?;
    let customer = run::read_customer(&cli.customer)?;

    tracing::info!(
        customer_id = %customer.customer_id,
        company = %customer.company,
        threshold = settings.pitchline.orchestrator.score_threshold,
        max_refinements = settings.pitchline.orchestrator.max_refinements,
        model = %settings.pitchline.llm.model,
        "starting pitchline run"
    );

    let result = run::execute(&settings, customer, cli.campaign).await?;
    serde_json::to_string_pretty(&result).map_err(|e| {
        pitchline_core::DecodeError::Malformed {
            reason: e.to_string(),
        }
        .into()
    })
}
