//! Configuration management for the data access layer.
//!
//! Configuration is layered: the process environment (optionally seeded from a
//! `.env` file) overrides `config/portal.toml`, and anything still missing
//! resolves to a safe default or the empty string. The
//! [`CredentialResolver`] turns the layers into an immutable
//! [`ConnectionDescriptor`].
//!
//! # Example
//!
//! ```no_run
//! use portal_store::config::{ConfigLayers, ConfigurationLoader, CredentialResolver, EnvironmentLoader};
//! use std::path::Path;
//!
//! let env = EnvironmentLoader::new(None);
//! let loader = ConfigurationLoader::new(Some(Path::new("config/portal.toml"))).unwrap();
//! let layers = ConfigLayers::from_environment(&env, loader.config.clone());
//!
//! let descriptor = CredentialResolver::resolve(&layers).unwrap();
//! println!("mode: {}", descriptor.mode());
//! ```

/// TOML configuration file
pub mod config;
/// Environment variables and `.env` loading
pub mod environment;
/// Credential resolution
pub mod resolver;

// Re-export main types for convenience
pub use self::config::{
    ConfigurationLoader, DatabaseConfig, DocumentConfig, LoggingConfig, PortalConfig,
};
pub use self::environment::EnvironmentLoader;
pub use self::resolver::{
    resolve, BackendMode, ConfigError, ConfigLayer, ConfigLayers, ConfigResult,
    ConnectionDescriptor, CredentialResolver, Endpoint, RelationalDriver, RelationalTarget,
    Secret,
};
