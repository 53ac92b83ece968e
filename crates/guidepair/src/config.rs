//! Configuration management for guidepair.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then `GUIDEPAIR_` environment variables.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::compat::PaceThresholds;
use crate::error::{Error, Result};
use crate::projector::SortDirection;
use crate::session::SessionSettings;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the platform config and data directories.
const APP_DIR_NAME: &str = "guidepair";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "pairings.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `GUIDEPAIR_`, sections separated by `__`)
/// 2. TOML config file at `~/.config/guidepair/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Pairing session configuration.
    pub pairing: PairingConfig,
    /// Guide compatibility thresholds.
    pub scoring: PaceThresholds,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/guidepair/pairings.db`
    pub database_path: Option<PathBuf>,
}

/// Pairing session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Initial sort direction of the athlete and guide lists.
    pub default_sort: SortDirection,
    /// Whether `maybe` sign-ups take part in pairing.
    pub include_maybe: bool,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            default_sort: SortDirection::Descending,
            include_maybe: true,
        }
    }
}

impl Config {
    /// Load configuration from the default file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::figment(config_file).extract::<Self>()?.validated()
    }

    fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("GUIDEPAIR_").split("__"))
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(APP_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a threshold is not positive or a regime's slight
    /// threshold is not below its significant one.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;

        for (name, value) in [
            ("regime_cutoff_minutes", s.regime_cutoff_minutes),
            ("fast_slight", s.fast_slight),
            ("fast_significant", s.fast_significant),
            ("slow_slight", s.slow_slight),
            ("slow_significant", s.slow_significant),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigValidation {
                    message: format!("scoring.{name} must be greater than 0 (got {value})"),
                });
            }
        }

        for (regime, slight, significant) in [
            ("fast", s.fast_slight, s.fast_significant),
            ("slow", s.slow_slight, s.slow_significant),
        ] {
            if slight >= significant {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "scoring.{regime}_slight ({slight}) must be less than scoring.{regime}_significant ({significant})"
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Settings for a new pairing session.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            sort: self.pairing.default_sort,
            thresholds: self.scoring,
        }
    }
}
