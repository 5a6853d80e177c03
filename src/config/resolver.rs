//! Credential resolution.
//!
//! Turns the layered configuration (environment, then config file, then the
//! empty string) into an immutable [`ConnectionDescriptor`]. There is no
//! built-in credential anywhere in this module: a missing password resolves to
//! `""` and is reported through a warning event.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::config::{DocumentConfig, PortalConfig};
use super::environment::EnvironmentLoader;
use crate::observability::events;

/// Default MySQL port
pub const DEFAULT_RELATIONAL_PORT: u16 = 3306;
/// Default MongoDB port
pub const DEFAULT_DOCUMENT_PORT: u16 = 27017;
/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
/// Default shutdown grace period in seconds
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Result type for configuration resolution
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A structurally required field is absent from every layer
    #[error("Configuration error: missing required field {field} (set {key})")]
    MissingField {
        /// Descriptor field
        field: &'static str,
        /// Environment key that would supply it
        key: &'static str,
    },

    /// A field is present but cannot be interpreted
    #[error("Configuration error: invalid value for {key}: {message}")]
    InvalidValue {
        /// Offending key
        key: &'static str,
        /// Why it was rejected
        message: String,
    },
}

/// Which backend the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// MySQL, or SQLite for local runs
    Relational,
    /// MongoDB/DocumentDB
    Document,
    /// In-memory fixtures, no database
    Mock,
}

impl BackendMode {
    /// Whether this mode targets a live database.
    pub fn is_live(&self) -> bool {
        !matches!(self, BackendMode::Mock)
    }
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relational" => Ok(Self::Relational),
            "document" => Ok(Self::Document),
            "mock" => Ok(Self::Mock),
            other => Err(format!(
                "unknown mode '{}', expected relational | document | mock",
                other
            )),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendMode::Relational => "relational",
            BackendMode::Document => "document",
            BackendMode::Mock => "mock",
        };
        f.write_str(s)
    }
}

/// SQL dialect of the relational target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationalDriver {
    /// MySQL
    MySql,
    /// SQLite file or in-memory database
    Sqlite,
}

impl FromStr for RelationalDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown driver '{}', expected mysql | sqlite", other)),
        }
    }
}

/// A secret value that never appears in `Debug` or `Display` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for handing to a driver.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<empty>")
        } else {
            f.write_str("<redacted>")
        }
    }
}

/// Network location and credentials of one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// User name; empty for no authentication
    pub user: String,
    /// Password
    pub password: Secret,
    /// Database name
    pub database: String,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.user.is_empty() {
            write!(f, "{}:{}/{}", self.host, self.port, self.database)
        } else {
            write!(
                f,
                "{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            )
        }
    }
}

/// Relational target: dialect plus endpoint.
///
/// For [`RelationalDriver::Sqlite`] the endpoint's `database` is the database
/// file path and host/port are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalTarget {
    /// SQL dialect
    pub driver: RelationalDriver,
    /// Where to connect
    pub endpoint: Endpoint,
}

/// Configuration layer that supplied a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigLayer {
    /// Process environment or `.env` file
    Environment,
    /// `config/portal.toml`
    ConfigFile,
    /// Built-in non-secret default (ports, timeouts, mode)
    Default,
    /// Nothing supplied the value; it resolved to the empty string
    Empty,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigLayer::Environment => "environment",
            ConfigLayer::ConfigFile => "config_file",
            ConfigLayer::Default => "default",
            ConfigLayer::Empty => "empty",
        };
        f.write_str(s)
    }
}

/// Resolved connection parameters. Built once by [`CredentialResolver`];
/// there are no setters.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    mode: BackendMode,
    relational: Option<RelationalTarget>,
    document: Option<Endpoint>,
    fixtures: Option<PathBuf>,
    connect_timeout: Duration,
    shutdown_grace: Duration,
    provenance: BTreeMap<String, ConfigLayer>,
}

impl ConnectionDescriptor {
    /// Descriptor for a pure mock run, with default timeouts.
    pub fn mock() -> Self {
        Self {
            mode: BackendMode::Mock,
            relational: None,
            document: None,
            fixtures: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            provenance: BTreeMap::new(),
        }
    }

    /// Requested backend mode
    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    /// Relational tier, if one is configured
    pub fn relational(&self) -> Option<&RelationalTarget> {
        self.relational.as_ref()
    }

    /// Document tier, if one is configured
    pub fn document(&self) -> Option<&Endpoint> {
        self.document.as_ref()
    }

    /// Fixture file for the mock adapter
    pub fn fixtures(&self) -> Option<&PathBuf> {
        self.fixtures.as_ref()
    }

    /// How long a connection attempt may take
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// How long `shutdown` waits for in-flight operations
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    /// Which layer supplied each resolved field.
    pub fn provenance(&self) -> &BTreeMap<String, ConfigLayer> {
        &self.provenance
    }
}

/// The configuration layers a descriptor is resolved from.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    /// Environment snapshot (highest precedence)
    pub env: BTreeMap<String, String>,
    /// Parsed config file
    pub file: PortalConfig,
}

impl ConfigLayers {
    /// Layers from an environment snapshot and a parsed config file
    pub fn new(env: BTreeMap<String, String>, file: PortalConfig) -> Self {
        Self { env, file }
    }

    /// Snapshot the process environment on top of a parsed config file.
    pub fn from_environment(env: &EnvironmentLoader, file: PortalConfig) -> Self {
        Self::new(env.snapshot(), file)
    }

    /// Environment-only layers from key/value pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            PortalConfig::default(),
        )
    }

    /// Replace the file layer.
    pub fn with_file(mut self, file: PortalConfig) -> Self {
        self.file = file;
        self
    }
}

/// Resolves a [`ConnectionDescriptor`] from [`ConfigLayers`].
pub struct CredentialResolver<'a> {
    layers: &'a ConfigLayers,
    provenance: BTreeMap<String, ConfigLayer>,
}

impl<'a> CredentialResolver<'a> {
    /// Resolve the layers into a descriptor.
    ///
    /// Emits one provenance event, plus a warning for every live endpoint
    /// whose password resolved to the empty string.
    pub fn resolve(layers: &'a ConfigLayers) -> ConfigResult<ConnectionDescriptor> {
        let mut resolver = Self {
            layers,
            provenance: BTreeMap::new(),
        };
        let descriptor = resolver.build()?;
        events::config_provenance(descriptor.mode, &descriptor.provenance);
        Ok(descriptor)
    }

    fn build(&mut self) -> ConfigResult<ConnectionDescriptor> {
        let layers = self.layers;
        let file = &layers.file.database;

        let mode = match self.pick("mode", "DB_MODE", file.mode.clone()) {
            Some(raw) => raw
                .parse::<BackendMode>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: "DB_MODE",
                    message,
                })?,
            None => {
                self.provenance.insert("mode".into(), ConfigLayer::Default);
                BackendMode::Relational
            }
        };

        let connect_timeout = Duration::from_secs(self.pick_u64(
            "connect_timeout",
            "DB_CONNECT_TIMEOUT_SECS",
            file.connect_timeout_secs,
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?);
        let shutdown_grace = Duration::from_secs(self.pick_u64(
            "shutdown_grace",
            "DB_SHUTDOWN_GRACE_SECS",
            file.shutdown_grace_secs,
            DEFAULT_SHUTDOWN_GRACE_SECS,
        )?);
        let fixtures = self
            .pick(
                "fixtures",
                "DB_FIXTURES",
                file.fixtures.as_ref().map(|p| p.to_string_lossy().to_string()),
            )
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let (relational, document) = match mode {
            BackendMode::Relational => {
                let relational = self.resolve_relational()?;
                let document = self.resolve_fallback_document()?;
                (Some(relational), document)
            }
            BackendMode::Document => (None, Some(self.resolve_primary_document()?)),
            BackendMode::Mock => (None, None),
        };

        Ok(ConnectionDescriptor {
            mode,
            relational,
            document,
            fixtures,
            connect_timeout,
            shutdown_grace,
            provenance: std::mem::take(&mut self.provenance),
        })
    }

    fn resolve_relational(&mut self) -> ConfigResult<RelationalTarget> {
        let layers = self.layers;
        let file = &layers.file.database;
        let driver = match self.pick("driver", "DB_DRIVER", file.driver.clone()) {
            Some(raw) => raw
                .parse::<RelationalDriver>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: "DB_DRIVER",
                    message,
                })?,
            None => {
                self.provenance.insert("driver".into(), ConfigLayer::Default);
                RelationalDriver::MySql
            }
        };

        let database = self.require("name", "DB_NAME", file.name.clone())?;

        let (host, port) = match driver {
            RelationalDriver::MySql => {
                let host = self.require("host", "DB_HOST", file.host.clone())?;
                let port =
                    self.pick_port("port", "DB_PORT", file.port, DEFAULT_RELATIONAL_PORT)?;
                (host, port)
            }
            RelationalDriver::Sqlite => {
                let host = self
                    .pick("host", "DB_HOST", file.host.clone())
                    .unwrap_or_else(|| "localhost".to_string());
                (host, 0)
            }
        };

        let user = self.pick_or_empty("user", "DB_USER", file.user.clone());
        let password = self.pick_password("password", "DB_PASSWORD", file.password.clone());
        if password.is_empty() && driver == RelationalDriver::MySql {
            events::missing_password("relational", "DB_PASSWORD");
        }

        Ok(RelationalTarget {
            driver,
            endpoint: Endpoint {
                host,
                port,
                user,
                password,
                database,
            },
        })
    }

    fn resolve_primary_document(&mut self) -> ConfigResult<Endpoint> {
        let layers = self.layers;
        let file = &layers.file.database;
        let host = self.require("host", "DB_HOST", file.host.clone())?;
        let database = self.require("name", "DB_NAME", file.name.clone())?;
        let port = self.pick_port("port", "DB_PORT", file.port, DEFAULT_DOCUMENT_PORT)?;
        let user = self.pick_or_empty("user", "DB_USER", file.user.clone());
        let password = self.pick_password("password", "DB_PASSWORD", file.password.clone());
        if password.is_empty() {
            events::missing_password("document", "DB_PASSWORD");
        }

        Ok(Endpoint {
            host,
            port,
            user,
            password,
            database,
        })
    }

    /// The document tier behind a relational primary. Absent entirely means
    /// "not configured"; half-configured is an error.
    fn resolve_fallback_document(&mut self) -> ConfigResult<Option<Endpoint>> {
        let file = self.layers.file.document.clone().unwrap_or_default();
        let DocumentConfig {
            host,
            port,
            user,
            password,
            name,
        } = file;

        let host = self.pick("document.host", "DOC_DB_HOST", host);
        let database = self.pick("document.name", "DOC_DB_NAME", name);

        match (host, database) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(ConfigError::MissingField {
                field: "document.host",
                key: "DOC_DB_HOST",
            }),
            (Some(_), None) => Err(ConfigError::MissingField {
                field: "document.name",
                key: "DOC_DB_NAME",
            }),
            (Some(host), Some(database)) => {
                let port =
                    self.pick_port("document.port", "DOC_DB_PORT", port, DEFAULT_DOCUMENT_PORT)?;
                let user = self.pick_or_empty("document.user", "DOC_DB_USER", user);
                let password = self.pick_password("document.password", "DOC_DB_PASSWORD", password);
                if password.is_empty() {
                    events::missing_password("document", "DOC_DB_PASSWORD");
                }
                Ok(Some(Endpoint {
                    host,
                    port,
                    user,
                    password,
                    database,
                }))
            }
        }
    }

    /// Environment first, then the config file. Records provenance on a hit.
    fn pick(&mut self, field: &str, key: &str, file_value: Option<String>) -> Option<String> {
        if let Some(value) = self.layers.env.get(key) {
            self.provenance
                .insert(field.to_string(), ConfigLayer::Environment);
            return Some(value.clone());
        }
        if let Some(value) = file_value {
            self.provenance
                .insert(field.to_string(), ConfigLayer::ConfigFile);
            return Some(value);
        }
        None
    }

    fn require(
        &mut self,
        field: &'static str,
        key: &'static str,
        file_value: Option<String>,
    ) -> ConfigResult<String> {
        match self.pick(field, key, file_value) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingField { field, key }),
        }
    }

    fn pick_or_empty(&mut self, field: &str, key: &str, file_value: Option<String>) -> String {
        self.pick(field, key, file_value).unwrap_or_else(|| {
            self.provenance.insert(field.to_string(), ConfigLayer::Empty);
            String::new()
        })
    }

    fn pick_password(&mut self, field: &str, key: &str, file_value: Option<String>) -> Secret {
        Secret::new(self.pick_or_empty(field, key, file_value))
    }

    fn pick_port(
        &mut self,
        field: &str,
        key: &'static str,
        file_value: Option<u16>,
        default: u16,
    ) -> ConfigResult<u16> {
        match self.pick(field, key, file_value.map(|p| p.to_string())) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue {
                    key,
                    message: format!("'{}' is not a port: {}", raw, e),
                }),
            None => {
                self.provenance.insert(field.to_string(), ConfigLayer::Default);
                Ok(default)
            }
        }
    }

    fn pick_u64(
        &mut self,
        field: &str,
        key: &'static str,
        file_value: Option<u64>,
        default: u64,
    ) -> ConfigResult<u64> {
        match self.pick(field, key, file_value.map(|v| v.to_string())) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    key,
                    message: format!("'{}' is not a number: {}", raw, e),
                }),
            None => {
                self.provenance.insert(field.to_string(), ConfigLayer::Default);
                Ok(default)
            }
        }
    }
}

/// Convenience wrapper around [`CredentialResolver::resolve`].
pub fn resolve(layers: &ConfigLayers) -> ConfigResult<ConnectionDescriptor> {
    CredentialResolver::resolve(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::DatabaseConfig;
    use crate::observability::events::capture::capture;

    fn relational_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DB_MODE", "relational"),
            ("DB_HOST", "db.internal"),
            ("DB_USER", "portal"),
            ("DB_NAME", "portal"),
        ]
    }

    #[test]
    fn test_missing_password_resolves_to_empty_string() {
        let layers = ConfigLayers::from_pairs(relational_env());
        let descriptor = resolve(&layers).unwrap();

        let target = descriptor.relational().unwrap();
        assert_eq!(target.endpoint.password.expose(), "");
        assert!(target.endpoint.password.is_empty());
        assert_eq!(
            descriptor.provenance().get("password"),
            Some(&ConfigLayer::Empty)
        );
    }

    #[test]
    fn test_resolve_warns_when_password_is_missing() {
        let layers = ConfigLayers::from_pairs(relational_env());
        let output = capture(|| {
            resolve(&layers).unwrap();
        });
        assert!(output.contains("WARN"));
        assert!(output.contains("connecting with an empty password"));
        assert!(output.contains("DB_PASSWORD"));

        let mut with_password = relational_env();
        with_password.push(("DB_PASSWORD", "hunter2"));
        let layers = ConfigLayers::from_pairs(with_password);
        let output = capture(|| {
            resolve(&layers).unwrap();
        });
        assert!(!output.contains("empty password"));
        assert!(!output.contains("hunter2"));
    }

    #[test]
    fn test_environment_overrides_config_file() {
        let file = PortalConfig {
            database: DatabaseConfig {
                host: Some("file-host".into()),
                port: Some(3310),
                password: Some("file-secret".into()),
                name: Some("file_db".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let layers = ConfigLayers::from_pairs(vec![("DB_HOST", "env-host")]).with_file(file);
        let descriptor = resolve(&layers).unwrap();

        let endpoint = &descriptor.relational().unwrap().endpoint;
        assert_eq!(endpoint.host, "env-host");
        assert_eq!(endpoint.port, 3310);
        assert_eq!(endpoint.database, "file_db");
        assert_eq!(endpoint.password.expose(), "file-secret");

        let provenance = descriptor.provenance();
        assert_eq!(provenance.get("host"), Some(&ConfigLayer::Environment));
        assert_eq!(provenance.get("port"), Some(&ConfigLayer::ConfigFile));
        assert_eq!(provenance.get("mode"), Some(&ConfigLayer::Default));
    }

    #[test]
    fn test_missing_host_is_configuration_error() {
        let layers = ConfigLayers::from_pairs(vec![("DB_MODE", "relational"), ("DB_NAME", "portal")]);
        let err = resolve(&layers).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingField {
                field: "host",
                key: "DB_HOST"
            }
        );
    }

    #[test]
    fn test_missing_database_name_is_configuration_error() {
        let layers = ConfigLayers::from_pairs(vec![("DB_MODE", "document"), ("DB_HOST", "mongo")]);
        let err = resolve(&layers).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "name", .. }));
    }

    #[test]
    fn test_mock_mode_requires_nothing() {
        let layers = ConfigLayers::from_pairs(vec![("DB_MODE", "mock")]);
        let descriptor = resolve(&layers).unwrap();
        assert_eq!(descriptor.mode(), BackendMode::Mock);
        assert!(descriptor.relational().is_none());
        assert!(descriptor.document().is_none());
    }

    #[test]
    fn test_invalid_mode_and_port() {
        let layers = ConfigLayers::from_pairs(vec![("DB_MODE", "graph")]);
        assert!(matches!(
            resolve(&layers),
            Err(ConfigError::InvalidValue { key: "DB_MODE", .. })
        ));

        let mut env = relational_env();
        env.push(("DB_PORT", "not-a-port"));
        let layers = ConfigLayers::from_pairs(env);
        assert!(matches!(
            resolve(&layers),
            Err(ConfigError::InvalidValue { key: "DB_PORT", .. })
        ));
    }

    #[test]
    fn test_sqlite_driver_needs_no_host() {
        let layers = ConfigLayers::from_pairs(vec![
            ("DB_DRIVER", "sqlite"),
            ("DB_NAME", "/tmp/portal.db"),
        ]);
        let descriptor = resolve(&layers).unwrap();
        let target = descriptor.relational().unwrap();
        assert_eq!(target.driver, RelationalDriver::Sqlite);
        assert_eq!(target.endpoint.database, "/tmp/portal.db");
    }

    #[test]
    fn test_fallback_document_tier() {
        let mut env = relational_env();
        env.push(("DOC_DB_HOST", "mongo.internal"));
        env.push(("DOC_DB_NAME", "portal_docs"));
        let descriptor = resolve(&ConfigLayers::from_pairs(env)).unwrap();

        let document = descriptor.document().unwrap();
        assert_eq!(document.host, "mongo.internal");
        assert_eq!(document.port, DEFAULT_DOCUMENT_PORT);
        assert_eq!(document.password.expose(), "");

        let mut env = relational_env();
        env.push(("DOC_DB_HOST", "mongo.internal"));
        assert!(matches!(
            resolve(&ConfigLayers::from_pairs(env)),
            Err(ConfigError::MissingField {
                field: "document.name",
                ..
            })
        ));
    }

    #[test]
    fn test_secrets_never_appear_in_debug_output() {
        let mut env = relational_env();
        env.push(("DB_PASSWORD", "hunter2"));
        let descriptor = resolve(&ConfigLayers::from_pairs(env)).unwrap();

        let debug = format!("{:?}", descriptor);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));

        let display = descriptor.relational().unwrap().endpoint.to_string();
        assert!(!display.contains("hunter2"));
        assert_eq!(display, "portal:<redacted>@db.internal:3306/portal");
    }

    #[test]
    fn test_timeouts() {
        let mut env = relational_env();
        env.push(("DB_CONNECT_TIMEOUT_SECS", "1"));
        let descriptor = resolve(&ConfigLayers::from_pairs(env)).unwrap();
        assert_eq!(descriptor.connect_timeout(), Duration::from_secs(1));
        assert_eq!(
            descriptor.shutdown_grace(),
            Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS)
        );
    }
}
