//! End-to-end learn/predict scenario against a running platform.
//!
//! 1. post storage resources (with blobs), then orchestrator registrations;
//! 2. wait for the latest learnuplet to be `done`;
//! 3. post prediction requests;
//! 4. wait for the latest preduplet to be `done`.
//!
//! Any uplet status other than `pending` or `done` ends the run. Sleeping is
//! injected through [`Sleeper`] so the loop can be driven in tests.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::client::{OrchestratorApi, PostOutcome, RemoteError, StorageApi, UpletKind};
use crate::config::PollingConfig;
use crate::error::{Error, Result};
use crate::metadata::{FixtureSet, Resource};
use crate::report::Reporter;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_DONE: &str = "done";

/// Blocks the current thread.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Real wall-clock sleeping.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Deserialize)]
struct UpletStatus {
    status: String,
}

/// Status of the first uplet of a `GET /<uplet kind>` body.
pub fn latest_status(kind: UpletKind, body: &[u8]) -> Result<String> {
    let decode_err = |reason: String| {
        Error::Remote(RemoteError::Decode {
            url: format!("/{}", kind.as_str()),
            reason: format!("{}. Body: {}", reason, String::from_utf8_lossy(body)),
        })
    };

    let mut lists: HashMap<String, Vec<UpletStatus>> =
        serde_json::from_slice(body).map_err(|e| decode_err(e.to_string()))?;
    let list = lists
        .remove(kind.list_key())
        .ok_or_else(|| decode_err(format!("missing key '{}'", kind.list_key())))?;
    list.into_iter()
        .next()
        .map(|u| u.status)
        .ok_or_else(|| decode_err("list is empty".to_string()))
}

/// Drives one harness run.
pub struct Harness<'a> {
    pub storage: &'a dyn StorageApi,
    pub orchestrator: &'a dyn OrchestratorApi,
    pub polling: PollingConfig,
    pub reporter: &'a dyn Reporter,
}

impl Harness<'_> {
    pub fn run(&self, fixtures: &FixtureSet, sleeper: &mut dyn Sleeper) -> Result<()> {
        self.reporter
            .info("", "Integration Tests Starting!".to_string());

        self.post_storage(fixtures)?;
        self.post_orchestrator(fixtures)?;
        self.wait_done(UpletKind::Learnuplet, sleeper)?;
        self.reporter.info(
            "learn",
            "SUCCESSFUL! Learnuplet status is DONE.".to_string(),
        );

        self.reporter
            .info("pred", "Posting prediction request".to_string());
        self.request_predictions(&fixtures.metadata.orchestrator.prediction)?;
        self.wait_done(UpletKind::Preduplet, sleeper)?;
        self.reporter.info(
            "pred",
            "SUCCESSFUL! Preduplet status is DONE.".to_string(),
        );

        self.reporter
            .info("", "SUCCESSFULLY LEARNED AND PREDICTED!".to_string());
        Ok(())
    }

    /// Upload problems, data and algos to storage, blobs included.
    pub fn post_storage(&self, fixtures: &FixtureSet) -> Result<()> {
        for (kind, resource) in fixtures.metadata.storage.in_order() {
            self.reporter
                .info("storage", format!("POST {}/{}", kind, resource.id));
            let blob = fixtures.data_blob(kind, &resource.id)?;
            let outcome = self.storage.post(kind, resource, &blob)?;
            self.note_outcome("storage", outcome, kind.as_str(), resource);
        }
        Ok(())
    }

    /// Register problems, data and algos with the orchestrator.
    pub fn post_orchestrator(&self, fixtures: &FixtureSet) -> Result<()> {
        for (kind, resource) in fixtures.metadata.orchestrator.registrations() {
            self.reporter
                .info("orchestrator", format!("POST {}/{}", kind, resource.id));
            let outcome = self.orchestrator.post(kind, resource)?;
            self.note_outcome("orchestrator", outcome, kind.as_str(), resource);
        }
        Ok(())
    }

    pub fn request_predictions(&self, predictions: &[Resource]) -> Result<()> {
        for resource in predictions {
            self.reporter
                .info("orchestrator", format!("POST prediction/{}", resource.id));
            let outcome = self.orchestrator.post_prediction(resource)?;
            self.note_outcome("orchestrator", outcome, "prediction", resource);
        }
        Ok(())
    }

    fn note_outcome(&self, scope: &str, outcome: PostOutcome, kind: &str, resource: &Resource) {
        if outcome == PostOutcome::AlreadyExists {
            self.reporter.info(
                scope,
                format!("{}/{} already exists, continuing", kind, resource.id),
            );
        }
    }

    /// Poll until the latest uplet of `kind` is `done`.
    ///
    /// Returns the number of status checks made.
    pub fn wait_done(&self, kind: UpletKind, sleeper: &mut dyn Sleeper) -> Result<u32> {
        let scope = match kind {
            UpletKind::Learnuplet => "learn",
            UpletKind::Preduplet => "pred",
        };

        sleeper.sleep(self.polling.initial_delay());
        let mut checks = 0u32;
        loop {
            let body = self.orchestrator.get_list(kind)?;
            let status = latest_status(kind, &body)?;
            checks += 1;

            if status == STATUS_DONE {
                return Ok(checks);
            }
            if status != STATUS_PENDING {
                return Err(Error::UpletFailed {
                    kind: kind.to_string(),
                    status,
                });
            }
            if let Some(max) = self.polling.max_checks {
                if checks >= max {
                    return Err(Error::PollTimeout {
                        kind: kind.to_string(),
                        checks,
                    });
                }
            }

            self.reporter.info(
                scope,
                format!(
                    "Waiting for {} status DONE on Orchestrator. Last status: {}. Checking again in {}s...",
                    kind,
                    status,
                    self.polling.interval_secs
                ),
            );
            sleeper.sleep(self.polling.interval());
        }
    }
}
