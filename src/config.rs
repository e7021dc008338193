//! Configuration for tagloop
//!
//! Settings come from three layers, later layers winning:
//! 1. Built-in defaults (localhost:39320, 500ms, the Channel1 tags)
//! 2. A YAML config file
//! 3. Command-line flags / environment variables ([`ConfigOverrides`])

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TagloopError};
use crate::poller::OverlapPolicy;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 39320;
pub const DEFAULT_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub gateway: GatewayConfig,
    pub poll: PollConfig,
    pub tags: TagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout_ms: 5000,
            username: None,
            password: None,
        }
    }
}

impl GatewayConfig {
    /// `scheme://host:port` without a trailing slash
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub overlap: OverlapPolicy,
    /// Stop after this many ticks even if the exit tag never turns 1
    pub max_ticks: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            overlap: OverlapPolicy::default(),
            max_ticks: None,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Tag identifiers read from and written to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    pub tag1: String,
    pub tag2: String,
    pub exit: String,
    pub sum: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            tag1: "Channel1.SimuDev.Tag1".to_string(),
            tag2: "Channel1.SimuDev.Tag2".to_string(),
            exit: "Channel1.SimuDev.exitLoop".to_string(),
            sum: "Channel1.PostProc.Sum of Tags".to_string(),
        }
    }
}

impl TagConfig {
    /// Identifiers in the order the read endpoint is queried
    pub fn read_ids(&self) -> [&str; 3] {
        [&self.tag1, &self.tag2, &self.exit]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            log_file: None,
            gateway: GatewayConfig::default(),
            poll: PollConfig::default(),
            tags: TagConfig::default(),
        }
    }
}

/// Result of [`Config::load`]
///
/// Logging is configured from the loaded file, so nothing is logged while
/// loading. Callers log `source` and `skipped` once the logger is up.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the config came from; `None` means built-in defaults
    pub source: Option<PathBuf>,
    /// Candidate files that exist but could not be read or parsed
    pub skipped: Vec<(PathBuf, String)>,
}

impl Config {
    /// Candidate files searched when no `--config` is given, highest priority first
    pub fn search_paths() -> Vec<PathBuf> {
        let name = env!("CARGO_PKG_NAME");
        let file_name = format!("{}.yml", name);
        dirs::config_dir()
            .map(|dir| dir.join(name).join(&file_name))
            .into_iter()
            .chain(std::iter::once(PathBuf::from(file_name)))
            .collect()
    }

    /// Load the explicit file, or the first usable file from [`Config::search_paths`].
    ///
    /// An explicit path that fails is an error; a broken search-path file is
    /// reported in `skipped` and the search moves on.
    pub fn load(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
        match config_path {
            Some(path) => {
                let config = Self::load_from_file(path).map_err(|e| {
                    TagloopError::Config(format!("Failed to load config from {}: {}", path.display(), e))
                })?;
                Ok(LoadedConfig {
                    config,
                    source: Some(path.clone()),
                    skipped: Vec::new(),
                })
            }
            None => Ok(Self::load_first(&Self::search_paths())),
        }
    }

    pub fn load_first(candidates: &[PathBuf]) -> LoadedConfig {
        let mut skipped = Vec::new();
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: Some(path.clone()),
                        skipped,
                    };
                }
                Err(e) => skipped.push((path.clone(), e.to_string())),
            }
        }
        LoadedConfig {
            config: Self::default(),
            source: None,
            skipped,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Apply command-line / environment overrides on top of the loaded file
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(host) = &overrides.host {
            self.gateway.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.gateway.port = port;
        }
        if let Some(interval_ms) = overrides.interval_ms {
            self.poll.interval_ms = interval_ms;
        }
        if let Some(overlap) = overrides.overlap {
            self.poll.overlap = overlap;
        }
        if let Some(max_ticks) = overrides.max_ticks {
            self.poll.max_ticks = Some(max_ticks);
        }
        if let Some(password) = &overrides.password {
            self.gateway.password = Some(password.clone());
        }
    }

    /// Reject settings the poller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_ms == 0 {
            return Err(TagloopError::Config("poll.interval_ms must be greater than 0".to_string()));
        }
        if self.gateway.host.trim().is_empty() {
            return Err(TagloopError::Config("gateway.host must not be empty".to_string()));
        }
        if self.gateway.port == 0 {
            return Err(TagloopError::Config("gateway.port must not be 0".to_string()));
        }
        if !matches!(self.gateway.scheme.as_str(), "http" | "https") {
            return Err(TagloopError::Config(format!(
                "gateway.scheme must be http or https, got {}",
                self.gateway.scheme
            )));
        }
        let tags = &self.tags;
        for (name, id) in [("tag1", &tags.tag1), ("tag2", &tags.tag2), ("exit", &tags.exit), ("sum", &tags.sum)] {
            if id.trim().is_empty() {
                return Err(TagloopError::Config(format!("tags.{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

/// Runtime overrides collected from flags and environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub interval_ms: Option<u64>,
    pub overlap: Option<OverlapPolicy>,
    pub max_ticks: Option<u64>,
    pub password: Option<String>,
}

impl ConfigOverrides {
    /// Check if any overrides are set.
    pub fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.interval_ms.is_none()
            && self.overlap.is_none()
            && self.max_ticks.is_none()
            && self.password.is_none()
    }

    /// Copy safe to log: the password is masked
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }
}
