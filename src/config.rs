//! Server configuration.
//!
//! Values come from an optional TOML file. Command-line flags and their
//! environment variables override the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use taskman_core::lifecycle::{LogNotifier, Notifier, NoopNotifier};
use taskman_core::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// Defaults to the platform data directory.
    pub database: Option<PathBuf>,
    /// How many of the most recent snapshots the task history shows.
    pub history_limit: u32,
    pub session_ttl_hours: i64,
    pub notify_status_changes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            database: None,
            history_limit: 100,
            session_ttl_hours: 24 * 14,
            notify_status_changes: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given. Otherwise reads the per-user config file if
    /// there is one and falls back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `config.toml` in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "taskman").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "history_limit must be at least 1".into(),
            ));
        }
        if self.session_ttl_hours <= 0 {
            return Err(ConfigError::Invalid(
                "session_ttl_hours must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        if self.notify_status_changes {
            Arc::new(LogNotifier)
        } else {
            Arc::new(NoopNotifier)
        }
    }

    /// Opens and migrates the configured database.
    pub fn open_database(&self) -> taskman_core::Result<Database> {
        let db = match &self.database {
            Some(path) => Database::open(path)?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        Ok(db.with_notifier(self.notifier()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 8080\nhistory_limit = 20").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.bind, "127.0.0.1");
        assert!(config.notify_status_changes);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prot = 8080").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn zero_history_limit_is_invalid() {
        let config = Config {
            history_limit: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
