//! Simulated algorithm: `train` and `predict` over a task volume.
//!
//! Volume layout:
//!
//! ```text
//! <volume>/
//! ├── train/          training inputs
//! │   └── pred/       predictions on the training inputs
//! ├── test/           test inputs
//! │   └── pred/       predictions on the test inputs
//! └── model/
//!     └── model_trained.json
//! ```

use clap::ValueEnum;
use std::path::{Path, PathBuf};

use crate::checksum::{validate_dir, HashTable};
use crate::copier::FixtureStore;
use crate::error::{Error, Result};
use crate::ledger::ModelLedger;
use crate::report::Reporter;

/// Default location of pre-baked prediction fixtures in the container.
pub const DEFAULT_PRED_FIXTURES: &str = "/fixtures/pred";

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum AlgoTask {
    Train,
    Predict,
}

impl std::fmt::Display for AlgoTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgoTask::Train => f.write_str("train"),
            AlgoTask::Predict => f.write_str("predict"),
        }
    }
}

/// Paths inside a task volume.
#[derive(Debug, Clone)]
pub struct Volume {
    root: PathBuf,
}

impl Volume {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn train_dir(&self) -> PathBuf {
        self.root.join("train")
    }

    pub fn train_pred_dir(&self) -> PathBuf {
        self.train_dir().join("pred")
    }

    pub fn test_dir(&self) -> PathBuf {
        self.root.join("test")
    }

    pub fn test_pred_dir(&self) -> PathBuf {
        self.test_dir().join("pred")
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join("model").join("model_trained.json")
    }
}

/// Everything the algo fixture needs for one invocation.
pub struct AlgoFixture<'a> {
    pub volume: Volume,
    pub table: &'a HashTable,
    pub fixtures: FixtureStore,
    pub reporter: &'a dyn Reporter,
}

/// What a run produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AlgoSummary {
    /// Ledger id written by a `train` run.
    pub model_id: Option<u64>,
    pub train_predictions: usize,
    pub test_predictions: usize,
}

impl AlgoFixture<'_> {
    fn ledger(&self) -> ModelLedger {
        ModelLedger::new(self.volume.model_path())
    }

    /// `train`: validate, record, predict on train, then predict on test.
    /// `predict`: predict on test only.
    pub fn run(&self, task: AlgoTask) -> Result<AlgoSummary> {
        let mut summary = AlgoSummary::default();

        if task == AlgoTask::Train {
            summary.model_id = Some(self.train()?);
            summary.train_predictions =
                self.predict(&self.volume.train_dir(), &self.volume.train_pred_dir())?;
        }

        summary.test_predictions =
            self.predict(&self.volume.test_dir(), &self.volume.test_pred_dir())?;

        Ok(summary)
    }

    /// Validate the training inputs and append a ledger record.
    pub fn train(&self) -> Result<u64> {
        let files = validate_dir(&self.volume.train_dir(), self.table)?;
        self.reporter.info(
            "train",
            format!("Starting training with {} data files", files.len()),
        );

        let record = self.ledger().record_training()?;
        self.reporter
            .info("train", format!("Model updated to version {}", record.id));
        Ok(record.id)
    }

    /// Substitute a prediction fixture for every file of `src_dir`.
    ///
    /// Every input is validated before the first copy, so an unknown file
    /// leaves `save_dir` untouched.
    pub fn predict(&self, src_dir: &Path, save_dir: &Path) -> Result<usize> {
        let ledger = self.ledger();
        if !ledger.has_model()? {
            return Err(Error::MissingModel {
                path: ledger.path().to_path_buf(),
            });
        }

        let files = validate_dir(src_dir, self.table)?;
        for file in &files {
            self.fixtures.substitute(file, save_dir)?;
            self.reporter
                .info("predict", format!("Successfully predicted on data {}", file.name));
        }
        Ok(files.len())
    }
}
