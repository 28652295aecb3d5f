//! # `algo-fixture`
//!
//! Simulated algorithm container entry point.
//!
//! ```bash
//! algo-fixture -T train -V /data/volume
//! algo-fixture -T predict -V /data/volume --fixtures /fixtures/pred
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use fixture_harness::algo::{AlgoFixture, AlgoTask, Volume, DEFAULT_PRED_FIXTURES};
use fixture_harness::checksum::HashTable;
use fixture_harness::copier::FixtureStore;
use fixture_harness::report::{LogFormat, Reporter};

/// Simulated algorithm: checksum-validates its inputs and substitutes
/// pre-baked predictions.
#[derive(Parser)]
#[command(name = "algo-fixture")]
struct Cli {
    /// Task to run.
    #[arg(short = 'T', value_enum)]
    task: AlgoTask,

    /// Task volume holding `train/`, `test/` and `model/`.
    #[arg(short = 'V')]
    volume: PathBuf,

    /// Directory of pre-baked predictions, one file per fixture id.
    #[arg(long, default_value = DEFAULT_PRED_FIXTURES)]
    fixtures: PathBuf,

    /// TOML hash table replacing the built-in one.
    #[arg(long)]
    hash_table: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,
}

fn run(cli: &Cli, reporter: &dyn Reporter) -> Result<()> {
    let table = match &cli.hash_table {
        Some(path) => HashTable::load(path)?,
        None => HashTable::builtin(),
    };

    reporter.info(
        "",
        format!(
            "Starting task '{}' with volume '{}'...",
            cli.task,
            cli.volume.display()
        ),
    );

    let fixture = AlgoFixture {
        volume: Volume::new(&cli.volume),
        table: &table,
        fixtures: FixtureStore::new(&cli.fixtures),
        reporter,
    };
    let summary = fixture.run(cli.task)?;

    reporter.info(
        "",
        format!(
            "Task '{}' complete: {} train predictions, {} test predictions",
            cli.task, summary.train_predictions, summary.test_predictions
        ),
    );
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
