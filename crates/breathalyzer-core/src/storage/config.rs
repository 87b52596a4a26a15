//! TOML-based application configuration.
//!
//! Stores station settings including:
//! - Cooldown between sessions and the stale-session timeout
//! - BAC bound and what happens to readings outside it
//! - Leaderboard and orphan file names
//! - HTTP bind address
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reading::{BacLimits, OutOfRangePolicy};
use crate::session::CooldownPolicy;

const CONFIG_FILE: &str = "config.toml";

/// Longest accepted `session.timeout_secs` (one week).
const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Session timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u32,
    /// Seconds before an unanswered session is dropped. 0 disables expiry.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Reading validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingConfig {
    #[serde(default = "default_max_bac")]
    pub max_bac: f64,
    #[serde(default)]
    pub out_of_range: OutOfRangePolicy,
    #[serde(default = "default_name_max_chars")]
    pub name_max_chars: usize,
}

/// File names inside the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_leaderboard_file")]
    pub leaderboard_file: String,
    #[serde(default = "default_orphans_file")]
    pub orphans_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub reading: ReadingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

// Default functions
fn default_cooldown_minutes() -> u32 {
    15
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_max_bac() -> f64 {
    0.5
}
fn default_name_max_chars() -> usize {
    40
}
fn default_leaderboard_file() -> String {
    "leaderboard.json".into()
}
fn default_orphans_file() -> String {
    "orphans.json".into()
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: default_cooldown_minutes(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            max_bac: default_max_bac(),
            out_of_range: OutOfRangePolicy::default(),
            name_max_chars: default_name_max_chars(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            leaderboard_file: default_leaderboard_file(),
            orphans_file: default_orphans_file(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    /// Load from `dir`, writing defaults there if no config file exists yet.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(dir);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(dir)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path_in(dir);
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The caller decides when to save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the field.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject settings the workflow cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.reading.max_bac.is_finite() || self.reading.max_bac <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "reading.max_bac".into(),
                message: format!("must be a positive number, got {}", self.reading.max_bac),
            });
        }
        if self.session.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                key: "session.timeout_secs".into(),
                message: format!(
                    "must be at most {MAX_TIMEOUT_SECS}, got {}",
                    self.session.timeout_secs
                ),
            });
        }
        if self.reading.name_max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reading.name_max_chars".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn bac_limits(&self) -> BacLimits {
        BacLimits::new(self.reading.max_bac, self.reading.out_of_range)
    }

    pub fn cooldown(&self) -> CooldownPolicy {
        CooldownPolicy::new(self.session.cooldown_minutes)
    }

    /// `None` when expiry is disabled.
    pub fn session_timeout(&self) -> Option<Duration> {
        match self.session.timeout_secs {
            0 => None,
            secs => i64::try_from(secs).ok().and_then(Duration::try_seconds),
        }
    }

    pub fn leaderboard_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.storage.leaderboard_file)
    }

    pub fn orphans_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.storage.orphans_file)
    }

}
