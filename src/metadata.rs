//! Fixture metadata: which resources the harness posts, and where.
//!
//! The metadata file groups resources by the service that receives them:
//!
//! ```yaml
//! storage:
//!   problem:
//!     - uuid: 6a5a6a3c-3f3a-4c7e-b1d2-60a5a0c1c0de
//!       name: sleep-stages
//!   data: []
//!   algo: []
//! orchestrator:
//!   problem: []
//!   data: []
//!   algo: []
//!   prediction: []
//! ```
//!
//! Fields other than `uuid` are opaque: they are forwarded as-is to the
//! service. Data blobs for storage resources live under the data root as
//! `<data>/<kind>/<uuid>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Problem,
    Data,
    Algo,
    Prediction,
}

impl ResourceKind {
    /// Path segment used both in service URLs and in the data root.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Problem => "problem",
            ResourceKind::Data => "data",
            ResourceKind::Algo => "algo",
            ResourceKind::Prediction => "prediction",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resource to post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "uuid", alias = "id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageResources {
    #[serde(default)]
    pub problem: Vec<Resource>,
    #[serde(default)]
    pub data: Vec<Resource>,
    #[serde(default)]
    pub algo: Vec<Resource>,
}

impl StorageResources {
    /// Resources in posting order: problems, data, algos.
    pub fn in_order(&self) -> Vec<(ResourceKind, &Resource)> {
        let mut all = Vec::new();
        all.extend(self.problem.iter().map(|r| (ResourceKind::Problem, r)));
        all.extend(self.data.iter().map(|r| (ResourceKind::Data, r)));
        all.extend(self.algo.iter().map(|r| (ResourceKind::Algo, r)));
        all
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrchestratorResources {
    #[serde(default)]
    pub problem: Vec<Resource>,
    #[serde(default)]
    pub data: Vec<Resource>,
    #[serde(default)]
    pub algo: Vec<Resource>,
    /// Prediction requests, posted only after learning is done.
    #[serde(default)]
    pub prediction: Vec<Resource>,
}

impl OrchestratorResources {
    /// Registration order: problems, data, algos. Predictions excluded.
    pub fn registrations(&self) -> Vec<(ResourceKind, &Resource)> {
        let mut all = Vec::new();
        all.extend(self.problem.iter().map(|r| (ResourceKind::Problem, r)));
        all.extend(self.data.iter().map(|r| (ResourceKind::Data, r)));
        all.extend(self.algo.iter().map(|r| (ResourceKind::Algo, r)));
        all
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureMetadata {
    #[serde(default)]
    pub storage: StorageResources,
    #[serde(default)]
    pub orchestrator: OrchestratorResources,
}

/// Parsed metadata plus the data root its blobs live under.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    pub metadata: FixtureMetadata,
    data_root: PathBuf,
}

impl FixtureSet {
    pub fn load(metadata_path: &Path, data_root: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(metadata_path).map_err(|e| Error::io(metadata_path, e))?;
        let metadata: FixtureMetadata =
            serde_yaml::from_str(&content).map_err(|e| Error::Metadata {
                path: metadata_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            metadata,
            data_root: data_root.to_path_buf(),
        })
    }

    pub fn data_path(&self, kind: ResourceKind, id: &Uuid) -> PathBuf {
        self.data_root.join(kind.as_str()).join(id.to_string())
    }

    /// Path of a resource's blob, checked to be a readable regular file.
    pub fn data_blob(&self, kind: ResourceKind, id: &Uuid) -> Result<PathBuf> {
        let path = self.data_path(kind, id);
        let meta = std::fs::metadata(&path).map_err(|e| Error::io(&path, e))?;
        if !meta.is_file() {
            return Err(Error::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        Ok(path)
    }
}
