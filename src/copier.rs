//! Fixture substitution.
//!
//! Given a validated input file, copy the pre-staged output for its fixture
//! id out of a read-only fixture directory into a destination directory,
//! under the input's own file name. This is how the fixture executables
//! "produce" predictions and detargeted files without computing anything.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::checksum::ValidatedFile;
use crate::error::{Error, Result};

/// Read-only directory of pre-baked outputs, keyed by fixture id.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    root: PathBuf,
}

impl FixtureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fixture_path(&self, fixture_id: &str) -> PathBuf {
        self.root.join(fixture_id)
    }

    /// Copy the fixture for `file` to `dest_dir/<file.name>`.
    ///
    /// `dest_dir` is created if missing. An existing destination file is
    /// replaced. Returns the destination path.
    pub fn substitute(&self, file: &ValidatedFile, dest_dir: &Path) -> Result<PathBuf> {
        let from = self.fixture_path(&file.fixture_id);
        let to = dest_dir.join(&file.name);

        copy_synced(&from, &to).map_err(|source| Error::Copy {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;

        Ok(to)
    }
}

/// Copy through a sibling temp file: write, flush, fsync, then rename.
///
/// A partially written destination is never visible under its final name,
/// and the temp file is removed on failure.
fn copy_synced(from: &Path, to: &Path) -> io::Result<()> {
    let mut input = File::open(from)?;

    let dest_dir = to
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    fs::create_dir_all(dest_dir)?;

    let file_name = to
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = dest_dir.join(format!(".{}.partial", file_name));

    let result = (|| -> io::Result<()> {
        let mut out = File::create(&tmp)?;
        io::copy(&mut input, &mut out)?;
        out.flush()?;
        out.sync_all()?;
        fs::rename(&tmp, to)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
