//! Configuration management with file persistence
//!
//! The original deployment hardcoded its database endpoint; here the
//! endpoint is configurable with a sensible default, resolved in order:
//! `MENSA_DB_PATH` environment variable, config file, default path.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::storage::{database, DatabaseConfig};

/// Mensa configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file (default path when absent)
    pub path: Option<PathBuf>,
    /// Maximum connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("MENSA_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("mensa")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Return default config without creating file
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be at least 1"));
        }
        Ok(())
    }

    /// Resolve the storage configuration
    ///
    /// Precedence: `MENSA_DB_PATH` environment variable, then the config
    /// file, then the default path.
    pub fn database_config(&self) -> DatabaseConfig {
        let path = env::var("MENSA_DB_PATH")
            .map(PathBuf::from)
            .ok()
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(database::default_database_path);

        DatabaseConfig::with_path(path).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_connections() {
        let config = Config {
            database: DatabaseSettings {
                path: None,
                max_connections: 0,
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config {
            database: DatabaseSettings {
                path: Some(PathBuf::from("/var/lib/mensa/mensa.db")),
                max_connections: 8,
            },
        };

        let contents = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&contents).unwrap();

        assert_eq!(parsed.database.path, config.database.path);
        assert_eq!(parsed.database.max_connections, 8);
    }

    #[test]
    fn test_database_config_uses_configured_path() {
        let config = Config {
            database: DatabaseSettings {
                path: Some(PathBuf::from("/var/lib/mensa/mensa.db")),
                max_connections: 8,
            },
        };

        let db_config = config.database_config();
        if env::var("MENSA_DB_PATH").is_err() {
            assert_eq!(db_config.path, PathBuf::from("/var/lib/mensa/mensa.db"));
        }
        assert_eq!(db_config.max_connections, 8);
    }
}
