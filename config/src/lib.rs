//! Sitewright configuration.
//!
//! Read from `$SITEWRIGHT_CONFIG` when set, otherwise
//! `~/.sitewright/config.toml`. Every section and field is optional.
//!
//! ```toml
//! [context]
//! max_messages = 50
//! max_tokens = 8000
//! preserve_system_messages = true
//! preserve_recent_count = 30
//! importance_markers = ["IMPORTANT", "Note:"]
//!
//! [store]
//! path = "${HOME}/.sitewright/sessions.db"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use sitewright_types::{ImportanceMarkers, PruningPolicy};

pub const CONFIG_ENV_VAR: &str = "SITEWRIGHT_CONFIG";

#[derive(Debug, Default, Deserialize)]
pub struct SitewrightConfig {
    pub context: Option<ContextConfig>,
    pub store: Option<StoreConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Overrides for the pruning policy. Unset fields keep the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ContextConfig {
    pub max_messages: Option<usize>,
    pub max_tokens: Option<u32>,
    pub preserve_system_messages: Option<bool>,
    pub preserve_recent_count: Option<usize>,
    /// Replaces the default markers entirely when present.
    pub importance_markers: Option<Vec<String>>,
}

impl ContextConfig {
    #[must_use]
    pub fn to_policy(&self) -> PruningPolicy {
        let defaults = PruningPolicy::default();
        PruningPolicy {
            max_messages: self.max_messages.unwrap_or(defaults.max_messages),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            preserve_system_messages: self
                .preserve_system_messages
                .unwrap_or(defaults.preserve_system_messages),
            preserve_recent_count: self
                .preserve_recent_count
                .unwrap_or(defaults.preserve_recent_count),
            importance_markers: self
                .importance_markers
                .as_ref()
                .map_or(defaults.importance_markers, |markers| {
                    ImportanceMarkers::new(markers.iter().cloned())
                }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    /// Session database location. `${VAR}` references are expanded.
    pub path: Option<String>,
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out
}

impl SitewrightConfig {
    /// Load from the default location. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// Load from `path`. A missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn policy(&self) -> PruningPolicy {
        self.context
            .as_ref()
            .map_or_else(PruningPolicy::default, ContextConfig::to_policy)
    }

    /// Configured store path (expanded), falling back to the default.
    #[must_use]
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store
            .as_ref()
            .and_then(|store| store.path.as_deref())
            .map(|raw| PathBuf::from(expand_env_vars(raw)))
            .or_else(default_store_path)
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".sitewright").join("config.toml"))
}

#[must_use]
pub fn default_store_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sitewright").join("sessions.db"))
}
