//! Error taxonomy shared by the fixture executables and the harness.
//!
//! Every fixture-mechanism failure is fatal: callers propagate it with `?`
//! up to `main`, which logs one `[FATAL ERROR]` line and exits non-zero.
//! The only downgraded condition, a remote "already exists" response, never
//! becomes an [`Error`]; see [`crate::client::PostOutcome`].

use std::path::PathBuf;

use crate::client::RemoteError;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file's content hash is not in the hash table.
    #[error("invalid checksum for file {file} ({checksum})")]
    UnknownFixture { file: String, checksum: String },

    /// A directory that must hold at least one regular file holds none.
    #[error("missing data in folder {}", path.display())]
    EmptyDirectory { path: PathBuf },

    /// Prediction was requested before any training record was written.
    #[error("missing model file {} for predict task", path.display())]
    MissingModel { path: PathBuf },

    #[error("failed to copy fixture {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Prediction outputs do not line up with their inputs.
    #[error(
        "missing files. test: {test}, test pred: {test_pred}, train: {train}, train pred: {train_pred}"
    )]
    CountMismatch {
        test: usize,
        test_pred: usize,
        train: usize,
        train_pred: usize,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model ledger {}: {source}", path.display())]
    MalformedLedger {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid hash table {}: {reason}", path.display())]
    HashTable { path: PathBuf, reason: String },

    #[error("invalid fixture metadata {}: {reason}", path.display())]
    Metadata { path: PathBuf, reason: String },

    /// An uplet left `pending` for anything other than `done`.
    #[error("{kind} status is '{status}', whereas it should be 'pending' or 'done'")]
    UpletFailed { kind: String, status: String },

    #[error("{kind} did not reach 'done' after {checks} status checks")]
    PollTimeout { kind: String, checks: u32 },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
