//! Simulated problem workflow: `detarget` and `perf`.
//!
//! `detarget` hides the ground truth of the test split by substituting the
//! label-stripped variant of every true test file into the submission
//! volume. `perf` checks that a submission predicted every input and writes
//! a performance report with random scores; no real evaluation happens.

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::checksum::{validate_dir, HashTable};
use crate::copier::FixtureStore;
use crate::error::{Error, Result};
use crate::report::Reporter;

/// Default location of label-stripped fixtures in the container.
pub const DEFAULT_UNTARGETED_FIXTURES: &str = "/fixtures/untargetedTest";

pub const PERF_FILE: &str = "performance.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProblemTask {
    Detarget,
    Perf,
}

impl std::fmt::Display for ProblemTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemTask::Detarget => f.write_str("detarget"),
            ProblemTask::Perf => f.write_str("perf"),
        }
    }
}

/// Directory layout across the hidden and submission volumes.
#[derive(Debug, Clone)]
pub struct ProblemPaths {
    hidden: PathBuf,
    submission: PathBuf,
}

impl ProblemPaths {
    pub fn new(hidden: impl Into<PathBuf>, submission: impl Into<PathBuf>) -> Self {
        Self {
            hidden: hidden.into(),
            submission: submission.into(),
        }
    }

    /// Test files with their targets.
    pub fn true_test_dir(&self) -> PathBuf {
        self.hidden.join("test")
    }

    pub fn detargeted_test_dir(&self) -> PathBuf {
        self.submission.join("test")
    }

    pub fn train_dir(&self) -> PathBuf {
        self.submission.join("train")
    }

    pub fn test_pred_dir(&self) -> PathBuf {
        self.submission.join("test").join("pred")
    }

    pub fn train_pred_dir(&self) -> PathBuf {
        self.submission.join("train").join("pred")
    }

    pub fn perf_dir(&self) -> PathBuf {
        self.hidden.join("perf")
    }

    pub fn perf_path(&self) -> PathBuf {
        self.perf_dir().join(PERF_FILE)
    }
}

/// Contents of `performance.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perfuplet {
    pub perf: f64,
    pub train_perf: BTreeMap<String, f64>,
    pub test_perf: BTreeMap<String, f64>,
}

pub struct ProblemFixture<'a> {
    pub paths: ProblemPaths,
    pub table: &'a HashTable,
    pub fixtures: FixtureStore,
    pub reporter: &'a dyn Reporter,
}

impl ProblemFixture<'_> {
    /// Substitute the untargeted variant of each true test file into the
    /// submission's test directory. Returns the number of files written.
    pub fn detarget(&self) -> Result<usize> {
        let src = self.paths.true_test_dir();
        let dest = self.paths.detargeted_test_dir();
        self.reporter.info(
            "detarget",
            format!("Removing targets from {} into {}...", src.display(), dest.display()),
        );

        let files = validate_dir(&src, self.table)?;
        for file in &files {
            self.fixtures.substitute(file, &dest)?;
            self.reporter
                .info("detarget", format!("Removed target from {}", file.name));
        }
        Ok(files.len())
    }

    /// Score the submission and write the report.
    ///
    /// All four directories are validated and the prediction counts checked
    /// before anything is written.
    pub fn perf<R: Rng>(&self, rng: &mut R) -> Result<Perfuplet> {
        let test = validate_dir(&self.paths.true_test_dir(), self.table)?;
        let train = validate_dir(&self.paths.train_dir(), self.table)?;
        let test_pred = validate_dir(&self.paths.test_pred_dir(), self.table)?;
        let train_pred = validate_dir(&self.paths.train_pred_dir(), self.table)?;

        if test.len() != test_pred.len() || train.len() != train_pred.len() {
            return Err(Error::CountMismatch {
                test: test.len(),
                test_pred: test_pred.len(),
                train: train.len(),
                train_pred: train_pred.len(),
            });
        }

        let mut test_perf = BTreeMap::new();
        for file in &test_pred {
            test_perf.insert(file.name.clone(), rng.gen::<f64>());
            self.reporter
                .info("perf", format!("Computed perf on {}", file.name));
        }
        let mut train_perf = BTreeMap::new();
        for file in &train_pred {
            train_perf.insert(file.name.clone(), rng.gen::<f64>());
            self.reporter
                .info("perf", format!("Computed perf on {}", file.name));
        }

        let report = Perfuplet {
            perf: rng.gen::<f64>(),
            train_perf,
            test_perf,
        };

        let dir = self.paths.perf_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        let path = self.paths.perf_path();
        let bytes = serde_json::to_vec(&report).map_err(|e| Error::io(&path, e.into()))?;
        fs::write(&path, bytes).map_err(|e| Error::io(&path, e))?;
        self.reporter
            .info("perf", format!("Saved performance to {}", path.display()));

        Ok(report)
    }
}
