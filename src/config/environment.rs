//! Environment variable loading and management.
//!
//! This module only reads the keys the data access layer understands
//! (`DB_*`, `DOC_DB_*`, `PORTAL_LOG_LEVEL`). Interpretation of the values is
//! left to the credential resolver.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

/// Keys recognized by the portal data access layer.
pub const RECOGNIZED_KEYS: &[&str] = &[
    "DB_HOST",
    "DB_PORT",
    "DB_USER",
    "DB_PASSWORD",
    "DB_NAME",
    "DB_MODE",
    "DB_DRIVER",
    "DB_CONNECT_TIMEOUT_SECS",
    "DB_SHUTDOWN_GRACE_SECS",
    "DB_FIXTURES",
    "DOC_DB_HOST",
    "DOC_DB_PORT",
    "DOC_DB_USER",
    "DOC_DB_PASSWORD",
    "DOC_DB_NAME",
    "PORTAL_LOG_LEVEL",
];

/// Loads environment variables from .env file and system environment.
#[derive(Debug, Clone)]
pub struct EnvironmentLoader {
    env_file: Option<String>,
}

impl EnvironmentLoader {
    /// Initialize the environment loader.
    ///
    /// # Arguments
    /// * `env_file` - Path to .env file. If None, no file is loaded.
    pub fn new(env_file: Option<&Path>) -> Self {
        // Only load a .env file if an explicit path was provided, so tests
        // never pick up a stray repository .env.
        if let Some(path) = env_file {
            if path.exists() {
                if let Err(e) = dotenv::from_path(path) {
                    tracing::warn!(
                        target: "portal_store::config",
                        path = %path.display(),
                        error = %e,
                        "failed to load .env file"
                    );
                }
            } else {
                tracing::warn!(
                    target: "portal_store::config",
                    path = %path.display(),
                    ".env file not found"
                );
            }
        }

        Self {
            env_file: env_file.map(|p| p.to_string_lossy().to_string()),
        }
    }

    /// Path of the .env file this loader was created with, if any.
    pub fn env_file(&self) -> Option<&str> {
        self.env_file.as_deref()
    }

    /// Read a single recognized key. Empty values count as set.
    pub fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    /// Requested log level (`PORTAL_LOG_LEVEL`).
    pub fn log_level(&self) -> Option<String> {
        self.get("PORTAL_LOG_LEVEL")
    }

    /// Snapshot of every recognized key currently present in the environment.
    ///
    /// The resolver works from this snapshot rather than the live process
    /// environment, so a descriptor never changes after it is built.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        RECOGNIZED_KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
            .collect()
    }
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
