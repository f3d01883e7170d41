//! Configuration management for guardian.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::controller::ControllerSettings;
use crate::device::DevicePermissions;
use crate::directory::DirectoryKind;
use crate::error::{Error, Result};
use crate::location::{LocationFix, UpdateRequest};
use crate::notifier::{DEFAULT_MAP_BASE_URL, DEFAULT_MESSAGE_PREFIX};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "guardian";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "guardian.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `GUARDIAN_`, sections separated
///    by `__`, e.g. `GUARDIAN_ALERT__COUNTDOWN_SECS=10`)
/// 2. TOML config file at `~/.config/guardian/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Alert timing and wording.
    pub alert: AlertConfig,
    /// Location update configuration.
    pub location: LocationConfig,
    /// Contact source configuration.
    pub contacts: ContactsConfig,
    /// Simulated device permissions.
    pub device: DevicePermissions,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/guardian/guardian.db`
    pub database_path: Option<PathBuf>,
    /// Maximum number of outbox messages to retain.
    /// Set to 0 for unlimited.
    pub max_outbox_messages: usize,
}

/// Alert-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Seconds between arming and sending.
    pub countdown_secs: u32,
    /// Text placed before the map link.
    pub message_prefix: String,
    /// Map link base; `<lat>,<lon>` is appended.
    pub map_url_base: String,
}

/// Location-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Minimum time between location updates in milliseconds.
    pub update_interval_ms: u64,
    /// Minimum displacement between updates in meters.
    pub min_distance_meters: f64,
    /// Track file replayed during an alert.
    pub track_file: Option<PathBuf>,
    /// Fixed latitude used when no track file is set.
    pub latitude: Option<f64>,
    /// Fixed longitude used when no track file is set.
    pub longitude: Option<f64>,
}

/// Contact-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactsConfig {
    /// Which directory supplies the contacts notified during an alert.
    pub source: DirectoryKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            max_outbox_messages: 10_000,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 5,
            message_prefix: DEFAULT_MESSAGE_PREFIX.to_string(),
            map_url_base: DEFAULT_MAP_BASE_URL.to_string(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 5_000,
            min_distance_meters: 10.0,
            track_file: None,
            latitude: None,
            longitude: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("GUARDIAN_").split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.alert.countdown_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "countdown_secs must be greater than 0".to_string(),
            });
        }

        if !self.alert.map_url_base.starts_with("http://")
            && !self.alert.map_url_base.starts_with("https://")
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "map_url_base must be an http(s) URL, got '{}'",
                    self.alert.map_url_base
                ),
            });
        }

        if self.location.update_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "update_interval_ms must be greater than 0".to_string(),
            });
        }

        let distance = self.location.min_distance_meters;
        if !distance.is_finite() || distance < 0.0 {
            return Err(Error::ConfigValidation {
                message: format!("min_distance_meters must be a non-negative number, got {distance}"),
            });
        }

        match (self.location.latitude, self.location.longitude) {
            (None, None) => {}
            (Some(lat), Some(lon)) => {
                LocationFix::new(lat, lon).map_err(|e| Error::ConfigValidation {
                    message: e.to_string(),
                })?;
            }
            _ => {
                return Err(Error::ConfigValidation {
                    message: "latitude and longitude must be set together".to_string(),
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

    /// Get the update interval as a Duration.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.location.update_interval_ms)
    }

    /// The configured fixed position, if any.
    #[must_use]
    pub fn fixed_position(&self) -> Option<LocationFix> {
        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => LocationFix::new(lat, lon).ok(),
            _ => None,
        }
    }

    /// Controller timing derived from this configuration.
    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            countdown: self.alert.countdown_secs,
            tick: Duration::from_secs(1),
            updates: UpdateRequest {
                interval: self.update_interval(),
                min_distance_meters: self.location.min_distance_meters,
            },
        }
    }
}
