use crate::error::ConfigError;
use anise_catalog::{CatalogConfig, MatchThresholds};
use anise_resource::{CacheConfig, OriginConfig, RenderConfig, SyncConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Handler list, message table and match thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Handler list, relative to the data root.
    pub handlers_path: PathBuf,
    pub messages_path: PathBuf,
    pub thresholds: MatchThresholds,
    /// Deadline for the party search API probe.
    pub party_search_timeout_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            handlers_path: PathBuf::from("resources/query/config.json"),
            messages_path: PathBuf::from("config/message_contents.json"),
            thresholds: MatchThresholds::default(),
            party_search_timeout_secs: 20,
        }
    }
}

impl QueryConfig {
    pub fn party_search_timeout(&self) -> Duration {
        Duration::from_secs(self.party_search_timeout_secs)
    }
}

/// Complete service configuration.
///
/// Every relative path in the nested sections is resolved under `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AniseConfig {
    pub root: PathBuf,
    pub catalog: CatalogConfig,
    pub origin: OriginConfig,
    pub render: RenderConfig,
    pub cache: CacheConfig,
    pub query: QueryConfig,
    pub sync: SyncConfig,
}

impl Default for AniseConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            catalog: CatalogConfig::default(),
            origin: OriginConfig::default(),
            render: RenderConfig::default(),
            cache: CacheConfig::default(),
            query: QueryConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl AniseConfig {
    /// Default configuration rooted at `root`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

/// Reads a TOML configuration file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AniseConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(AniseConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
