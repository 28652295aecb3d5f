//! # `integration-harness`
//!
//! Runs the learn/predict scenario against a running platform devenv.
//!
//! ```bash
//! integration-harness
//! integration-harness --config ./config/harness.toml
//! PATH_METADATA=./tests/fixtures.yaml PATH_DATA=./data/fixtures integration-harness
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use fixture_harness::client::{OrchestratorClient, StorageClient};
use fixture_harness::config;
use fixture_harness::harness::{Harness, ThreadSleeper};
use fixture_harness::metadata::FixtureSet;
use fixture_harness::report::{LogFormat, Reporter};

/// Post fixtures to storage and orchestrator, then wait for learning and
/// prediction to complete.
#[derive(Parser)]
#[command(name = "integration-harness", version)]
struct Cli {
    /// Configuration file (TOML). Devenv defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixture metadata YAML. Overrides config and `PATH_METADATA`.
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Fixture data root. Overrides config and `PATH_DATA`.
    #[arg(long)]
    data: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,
}

fn run(cli: &Cli, reporter: &dyn Reporter) -> Result<()> {
    let mut cfg = config::resolve_config(cli.config.as_deref())?;
    if let Some(metadata) = &cli.metadata {
        cfg.fixtures.metadata = metadata.clone();
    }
    if let Some(data) = &cli.data {
        cfg.fixtures.data = data.clone();
    }

    let fixtures = FixtureSet::load(&cfg.fixtures.metadata, &cfg.fixtures.data)
        .context("[fixtures] Error loading Fixtures")?;

    let timeout = Duration::from_secs(cfg.http.timeout_secs);
    let storage = StorageClient::new(&cfg.storage, timeout)?;
    let orchestrator = OrchestratorClient::new(&cfg.orchestrator, timeout)?;

    let harness = Harness {
        storage: &storage,
        orchestrator: &orchestrator,
        polling: cfg.polling.clone(),
        reporter,
    };
    harness.run(&fixtures, &mut ThreadSleeper)?;

    reporter.info("", "GREAT SUCCESS!".to_string());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let reporter = cli.log_format.reporter();

    match run(&cli, reporter.as_ref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.fatal(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
