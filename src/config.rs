use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AppError, Result};

const CONFIG_FILE: &str = "recruit.toml";

/// Runtime configuration, read from `recruit.toml` in the user config directory.
/// Every field has a default, so a missing file is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    /// Root of the object storage; each bucket is a subdirectory.
    pub storage_dir: PathBuf,
    pub session_path: PathBuf,
    /// The single identity whose stage changes go through approval.
    pub director_email: String,
    /// Model used by `parse-resume`.
    pub model: String,
    pub aging: AgingThresholds,
}

/// Review queue aging banners: `warn_days..=critical_days` is medium, above is high.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgingThresholds {
    pub warn_days: i64,
    pub critical_days: i64,
}

impl Default for AgingThresholds {
    fn default() -> Self {
        Self {
            warn_days: 3,
            critical_days: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            database_path: data_dir.join("recruit.db"),
            storage_dir: data_dir.join("storage"),
            session_path: data_dir.join("session.json"),
            director_email: "director@agency.local".to_string(),
            model: "api-sonnet".to_string(),
            aging: AgingThresholds::default(),
        }
    }
}

impl Config {
    /// Loads from `path`, or from the default location when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let config = Self::from_toml(&raw)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)
            .map_err(|e| AppError::Config(format!("invalid {}: {}", CONFIG_FILE, e)))?;
        if config.aging.warn_days > config.aging.critical_days {
            return Err(AppError::Config(format!(
                "aging.warn_days ({}) must not exceed aging.critical_days ({})",
                config.aging.warn_days, config.aging.critical_days
            )));
        }
        Ok(config)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "recruit").map(|d| d.config_dir().join(CONFIG_FILE))
}

fn data_dir() -> PathBuf {
    // Use XDG data directory or fallback
    directories::ProjectDirs::from("", "", "recruit")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml("director_email = \"lead@agency.test\"\n").unwrap();
        assert_eq!(config.director_email, "lead@agency.test");
        assert_eq!(config.aging, AgingThresholds::default());
        assert!(config.database_path.ends_with("recruit.db"));
    }

    #[test]
    fn test_aging_section_overrides() {
        let config = Config::from_toml("[aging]\nwarn_days = 2\ncritical_days = 7\n").unwrap();
        assert_eq!(config.aging.warn_days, 2);
        assert_eq!(config.aging.critical_days, 7);
    }

    #[test]
    fn test_rejects_inverted_aging_thresholds() {
        let err = Config::from_toml("[aging]\nwarn_days = 9\ncritical_days = 5\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.director_email, "director@agency.local");
    }
}
