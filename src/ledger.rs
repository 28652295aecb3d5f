//! Model ledger stub.
//!
//! Simulates model versioning: every training run appends one numbered
//! record to a JSON array file. The file is read, extended and rewritten
//! whole on each call. There is no locking, so concurrent writers can lose
//! records; the fixture executables are single-instance per invocation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Message stored for every training event.
pub const TRAIN_MESSAGE: &str = "Train";

/// One entry of the model ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: u64,
    #[serde(rename = "msg")]
    pub message: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Ledger file at a fixed path, usually `<volume>/model/model_trained.json`.
#[derive(Debug, Clone)]
pub struct ModelLedger {
    path: PathBuf,
}

impl ModelLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, oldest first. An absent file is an empty ledger.
    pub fn load(&self) -> Result<Vec<ModelRecord>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.path, e)),
        };
        serde_json::from_slice(&data).map_err(|source| Error::MalformedLedger {
            path: self.path.clone(),
            source,
        })
    }

    /// True when at least one training event has been recorded.
    pub fn has_model(&self) -> Result<bool> {
        Ok(!self.load()?.is_empty())
    }

    /// Record a training event stamped with the current wall-clock time.
    pub fn record_training(&self) -> Result<ModelRecord> {
        self.record_at(TRAIN_MESSAGE, chrono::Utc::now().timestamp())
    }

    /// Append a record with an explicit message and timestamp.
    ///
    /// The new id is one past the last record's id, or 0 on an empty
    /// ledger.
    pub fn record_at(&self, message: &str, timestamp: i64) -> Result<ModelRecord> {
        let mut records = self.load()?;
        let id = records.last().map(|r| r.id + 1).unwrap_or(0);
        let record = ModelRecord {
            id,
            message: message.to_string(),
            timestamp,
        };
        records.push(record.clone());
        self.write_all(&records)?;
        Ok(record)
    }

    fn write_all(&self, records: &[ModelRecord]) -> Result<()> {
        let bytes = serde_json::to_vec(records).map_err(|source| Error::MalformedLedger {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut out = fs::File::create(&tmp)?;
            out.write_all(&bytes)?;
            out.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::io(&self.path, e)
        })
    }
}
