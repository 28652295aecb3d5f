//! Integration harness configuration.
//!
//! Every section is optional and defaults to the local devenv (services on
//! `0.0.0.0`, storage on 8081, orchestrator on 8083). The `PATH_METADATA`
//! and `PATH_DATA` environment variables override the fixture paths, and
//! command-line flags override both.
//!
//! ```toml
//! [orchestrator]
//! host = "orchestrator.local"
//! port = 8083
//! user = "u"
//! password = "p"
//!
//! [fixtures]
//! metadata = "tests/fixtures.yaml"
//! data = "data/fixtures"
//!
//! [polling]
//! interval_secs = 20
//! max_checks = 90
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_orchestrator")]
    pub orchestrator: ServiceConfig,
    #[serde(default = "default_storage")]
    pub storage: ServiceConfig,
    #[serde(default)]
    pub fixtures: FixturesConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Address and basic-auth credentials of one platform service.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ServiceConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_orchestrator() -> ServiceConfig {
    ServiceConfig {
        host: default_host(),
        port: 8083,
        user: Some("u".to_string()),
        password: Some("p".to_string()),
    }
}

fn default_storage() -> ServiceConfig {
    ServiceConfig {
        host: default_host(),
        port: 8081,
        user: Some("u".to_string()),
        password: Some("p".to_string()),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FixturesConfig {
    /// YAML describing the resources to post.
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,
    /// Root of the data blobs, laid out as `<data>/<kind>/<uuid>`.
    #[serde(default = "default_data")]
    pub data: PathBuf,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            metadata: default_metadata(),
            data: default_data(),
        }
    }
}

fn default_metadata() -> PathBuf {
    PathBuf::from("tests/fixtures.yaml")
}
fn default_data() -> PathBuf {
    PathBuf::from("data/fixtures")
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Wait after submitting work, before the first status check.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Give up after this many checks. Unset waits forever.
    #[serde(default)]
    pub max_checks: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay(),
            interval_secs: default_interval(),
            max_checks: None,
        }
    }
}

impl PollingConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_initial_delay() -> u64 {
    2
}
fn default_interval() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orchestrator: default_orchestrator(),
            storage: default_storage(),
            fixtures: FixturesConfig::default(),
            polling: PollingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Parse and validate a config file. Environment overrides are not applied.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Resolve the effective config: file (or defaults), then environment.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Apply `PATH_METADATA` / `PATH_DATA`. Empty values are ignored.
fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(value) = lookup("PATH_METADATA").filter(|v| !v.is_empty()) {
        config.fixtures.metadata = PathBuf::from(value);
    }
    if let Some(value) = lookup("PATH_DATA").filter(|v| !v.is_empty()) {
        config.fixtures.data = PathBuf::from(value);
    }
}

fn validate(config: &Config) -> Result<()> {
    for (name, service) in [
        ("orchestrator", &config.orchestrator),
        ("storage", &config.storage),
    ] {
        if service.host.is_empty() {
            bail!("{}.host must not be empty", name);
        }
        if service.port == 0 {
            bail!("{}.port must be > 0", name);
        }
        if service.user.is_some() != service.password.is_some() {
            bail!("{}.user and {}.password must be set together", name, name);
        }
    }

    if config.polling.interval_secs == 0 {
        bail!("polling.interval_secs must be > 0");
    }
    if config.polling.max_checks == Some(0) {
        bail!("polling.max_checks must be >= 1 when set");
    }
    if config.http.timeout_secs == 0 {
        bail!("http.timeout_secs must be > 0");
    }

    Ok(())
}
