//! # `problem-fixture`
//!
//! Simulated problem container entry point.
//!
//! ```bash
//! problem-fixture -T detarget -i /hidden -s /submission
//! problem-fixture -T perf -i /hidden -s /submission
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use fixture_harness::checksum::HashTable;
use fixture_harness::copier::FixtureStore;
use fixture_harness::problem::{
    ProblemFixture, ProblemPaths, ProblemTask, DEFAULT_UNTARGETED_FIXTURES,
};
use fixture_harness::report::{LogFormat, Reporter};

/// Simulated problem: detargets test data and scores submissions with
/// random performance values.
#[derive(Parser)]
#[command(name = "problem-fixture")]
struct Cli {
    /// Task to run.
    #[arg(short = 'T', value_enum)]
    task: ProblemTask,

    /// Hidden volume (true test files, performance report).
    #[arg(short = 'i')]
    hidden_path: PathBuf,

    /// Submission volume (train files, detargeted test files, predictions).
    #[arg(short = 's')]
    submission_path: PathBuf,

    /// Directory of label-stripped files, one file per fixture id.
    #[arg(long, default_value = DEFAULT_UNTARGETED_FIXTURES)]
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
            "Starting task '{}' with hidden_path '{}' and submission_path '{}'...",
            cli.task,
            cli.hidden_path.display(),
            cli.submission_path.display()
        ),
    );

    let problem = ProblemFixture {
        paths: ProblemPaths::new(&cli.hidden_path, &cli.submission_path),
        table: &table,
        fixtures: FixtureStore::new(&cli.fixtures),
        reporter,
    };

    match cli.task {
        ProblemTask::Detarget => {
            problem.detarget()?;
        }
        ProblemTask::Perf => {
            let report = problem.perf(&mut rand::thread_rng())?;
            reporter.info("perf", format!("Overall perf: {:.4}", report.perf));
        }
    }
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
