//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/actiontree/actiontree.toml`
//! 3. Local config: a file given by the caller
//! 4. Environment variables: `ACTIONTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::DEFAULT_BOND_WEIGHT;

/// Prefix of environment overrides, e.g. `ACTIONTREE_CHECKIN_PERSIST=5`.
pub const ENV_PREFIX: &str = "ACTIONTREE";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment: {0}")]
    Env(#[from] config::ConfigError),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Tunables of forests and action trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Bond weight used when binding without an explicit weight
    pub default_bond_weight: f64,
    /// How many times a node checkin is polled before navigation gives up
    pub checkin_persist: u32,
    /// Entries kept in the navigation history (0 disables it)
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_bond_weight: DEFAULT_BOND_WEIGHT,
            checkin_persist: 3,
            history_limit: 64,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub default_bond_weight: Option<f64>,
    pub checkin_persist: Option<u32>,
    pub history_limit: Option<usize>,
}

/// Get the XDG config directory for actiontree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "actiontree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("actiontree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            default_bond_weight: overlay
                .default_bond_weight
                .unwrap_or(self.default_bond_weight),
            checkin_persist: overlay.checkin_persist.unwrap_or(self.checkin_persist),
            history_limit: overlay.history_limit.unwrap_or(self.history_limit),
        }
    }

    /// Load settings with layered precedence from the standard locations.
    pub fn load(local: Option<&Path>) -> Result<Self, SettingsError> {
        let global = global_config_path();
        Self::load_from(global.as_deref(), local, ENV_PREFIX)
    }

    /// Load settings from explicit layers.
    ///
    /// Missing files are skipped; unreadable or malformed ones are errors.
    #[instrument(level = "debug")]
    pub fn load_from(
        global: Option<&Path>,
        local: Option<&Path>,
        env_prefix: &str,
    ) -> Result<Self, SettingsError> {
        let mut current = Self::default();

        for path in [global, local].into_iter().flatten() {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
                debug!(path = %path.display(), "settings layer applied");
            }
        }

        current = Self::apply_env_overrides(current, env_prefix)?;
        current.validate()
    }

    /// Apply `<PREFIX>_*` environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self, prefix: &str) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        if let Ok(val) = config.get_float("default_bond_weight") {
            settings.default_bond_weight = val;
        }
        if let Ok(val) = config.get_int("checkin_persist") {
            settings.checkin_persist = u32::try_from(val).map_err(|e| SettingsError::Invalid {
                key: "checkin_persist",
                message: e.to_string(),
            })?;
        }
        if let Ok(val) = config.get_int("history_limit") {
            settings.history_limit = usize::try_from(val).map_err(|e| SettingsError::Invalid {
                key: "history_limit",
                message: e.to_string(),
            })?;
        }

        Ok(settings)
    }

    fn validate(self) -> Result<Self, SettingsError> {
        if !self.default_bond_weight.is_finite() {
            return Err(SettingsError::Invalid {
                key: "default_bond_weight",
                message: format!("{} is not a finite number", self.default_bond_weight),
            });
        }
        if self.checkin_persist == 0 {
            return Err(SettingsError::Invalid {
                key: "checkin_persist",
                message: "at least one checkin attempt is required".to_string(),
            });
        }
        Ok(self)
    }
}
