//! Configuration module
//!
//! Settings are read from a TOML file (`~/.config/cms-identity/config.toml`
//! by default). Every section and key is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::infrastructure::crypto::password::DEFAULT_COST;
use crate::infrastructure::DatabaseConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub security: SecuritySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: defaults.url,
            max_connections: defaults.max_connections,
        }
    }
}

impl From<&DatabaseSettings> for DatabaseConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            url: settings.url.clone(),
            max_connections: settings.max_connections,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub bcrypt_cost: u32,
    /// Account created on first start when the user table is empty
    pub admin: Option<AdminSettings>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            bcrypt_cost: DEFAULT_COST,
            admin: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminSettings {
    pub username: String,
    pub email: String,
    #[serde(default = "default_admin_display_name")]
    pub display_name: String,
    pub password: String,
}

fn default_admin_display_name() -> String {
    "Administrator".to_string()
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// `<config dir>/cms-identity/config.toml`, or `./config.toml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("cms-identity").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.database.url, DatabaseConfig::default().url);
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
        assert_eq!(cfg.security.bcrypt_cost, DEFAULT_COST);
        assert!(cfg.security.admin.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [database]
            url = "sqlite::memory:"

            [security]
            bcrypt_cost = 6

            [security.admin]
            username = "admin"
            email = "admin@example.com"
            password = "change-me"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.database.url, "sqlite::memory:");
        assert_eq!(
            cfg.database.max_connections,
            DatabaseConfig::default().max_connections
        );
        assert_eq!(cfg.security.bcrypt_cost, 6);

        let admin = cfg.security.admin.unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.display_name, "Administrator");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(matches!(
            AppConfig::from_toml("[database\nurl = 1"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load(Path::new("/nonexistent/cms-identity.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn default_path_ends_with_file_name() {
        assert!(default_config_path().ends_with("config.toml"));
    }
}
