//! TOML configuration parsing and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::SchemaSpec;

/// Main configuration structure (`config/portal.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Primary database section
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Secondary document target, tried when the relational tier fails
    #[serde(default)]
    pub document: Option<DocumentConfig>,
    /// Logging section
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Collections and indexes to provision; the portal default is used when absent
    #[serde(default)]
    pub schema: Option<SchemaSpec>,
}

/// Primary database configuration. Every field is optional here: the
/// environment overrides the file, and the resolver decides what is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `relational`, `document`, or `mock`
    pub mode: Option<String>,
    /// `mysql` or `sqlite`
    pub driver: Option<String>,
    /// Database host
    pub host: Option<String>,
    /// Database port
    pub port: Option<u16>,
    /// Database user
    pub user: Option<String>,
    /// Database password
    pub password: Option<String>,
    /// Database name (the file path for SQLite)
    pub name: Option<String>,
    /// Connection timeout in seconds
    pub connect_timeout_secs: Option<u64>,
    /// Seconds `shutdown` waits for in-flight operations
    pub shutdown_grace_secs: Option<u64>,
    /// JSON fixture file for the mock adapter
    pub fixtures: Option<PathBuf>,
}

/// Fallback document store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Document store host
    pub host: Option<String>,
    /// Document store port
    pub port: Option<u16>,
    /// Document store user
    pub user: Option<String>,
    /// Document store password
    pub password: Option<String>,
    /// Document database name
    pub name: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when `LOG_LEVEL` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Loads and manages TOML configuration.
#[derive(Debug)]
pub struct ConfigurationLoader {
    /// Path the configuration was read from
    pub config_path: PathBuf,
    /// Parsed configuration (defaults when the file is absent)
    pub config: PortalConfig,
    /// Whether `config_path` existed and was parsed
    pub loaded_from_file: bool,
}

impl ConfigurationLoader {
    /// Initialize configuration loader.
    ///
    /// # Arguments
    /// * `config_path` - Path to TOML config file. If None, uses `config/portal.toml`.
    ///   A missing file yields the default (empty) configuration.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config_path = config_path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("config/portal.toml"));

        let (config, loaded_from_file) = if config_path.exists() {
            (Self::load_config(&config_path)?, true)
        } else {
            (PortalConfig::default(), false)
        };

        Ok(Self {
            config_path,
            config,
            loaded_from_file,
        })
    }

    /// Create a configuration loader from a pre-parsed configuration.
    pub fn from_config(config: PortalConfig) -> Self {
        Self {
            config_path: PathBuf::from("config/portal.toml"),
            config,
            loaded_from_file: false,
        }
    }

    /// Load configuration from TOML file.
    fn load_config(path: &Path) -> Result<PortalConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Schema to provision: the configured one, or the portal default.
    pub fn schema(&self) -> SchemaSpec {
        self.config
            .schema
            .clone()
            .unwrap_or_else(SchemaSpec::portal_default)
    }

    /// Configured log level.
    pub fn log_level(&self) -> &str {
        &self.config.logging.log_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let loader = ConfigurationLoader::new(Some(Path::new("/nonexistent/portal.toml"))).unwrap();
        assert!(!loader.loaded_from_file);
        assert!(loader.config.database.host.is_none());
        assert!(loader.config.document.is_none());
        assert_eq!(loader.log_level(), "INFO");
        assert_eq!(loader.schema(), SchemaSpec::portal_default());
    }

    #[test]
    fn test_portal_config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.toml");
        fs::write(
            &path,
            r#"
[database]
mode = "relational"
host = "db.internal"
port = 3307
user = "portal"
name = "portal"
connect_timeout_secs = 2

[document]
host = "mongo.internal"
name = "portal_docs"

[logging]
log_level = "DEBUG"

[[schema.collections]]
name = "staff"
indexes = [{ field = "email", unique = true }]
"#,
        )
        .unwrap();

        let loader = ConfigurationLoader::new(Some(&path)).unwrap();
        assert!(loader.loaded_from_file);

        let db = &loader.config.database;
        assert_eq!(db.mode.as_deref(), Some("relational"));
        assert_eq!(db.host.as_deref(), Some("db.internal"));
        assert_eq!(db.port, Some(3307));
        assert!(db.password.is_none());
        assert_eq!(db.connect_timeout_secs, Some(2));

        let doc = loader.config.document.as_ref().unwrap();
        assert_eq!(doc.host.as_deref(), Some("mongo.internal"));
        assert_eq!(loader.log_level(), "DEBUG");

        let schema = loader.schema();
        assert_eq!(schema.collections.len(), 1);
        assert_eq!(schema.collections[0].name, "staff");
        assert!(schema.collections[0].indexes[0].unique);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.toml");
        fs::write(&path, "[database\nhost = ").unwrap();

        let err = ConfigurationLoader::new(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }
}
