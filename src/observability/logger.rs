//! Logging setup for the data access layer.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs the process-wide `tracing` subscriber.
///
/// Diagnostic events go to stderr, or are appended to `log_file` when one is
/// given. `RUST_LOG` takes precedence over `log_level` when set.
#[derive(Debug)]
pub struct Logger {
    log_file: Option<PathBuf>,
    log_level: String,
}

impl Logger {
    /// Initialize logger.
    ///
    /// # Arguments
    /// * `log_file` - Path to log file. If None, logs go to stderr.
    /// * `log_level` - Logging level (defaults to "INFO").
    pub fn new(log_file: Option<&Path>, log_level: Option<&str>) -> Result<Self> {
        if let Some(parent) = log_file.and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self {
            log_file: log_file.map(Path::to_path_buf),
            log_level: normalize_level(log_level.unwrap_or("INFO")),
        })
    }

    /// Log file, if not logging to stderr
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Configured level directive
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Build the env filter for this logger.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }

    /// Install the subscriber. Returns an error if one is already installed.
    pub fn install(&self) -> Result<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_target(true)
            .compact();

        match &self.log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file: {}", path.display()))?;
                builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init()
                    .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
            }
            None => builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e)),
        }
    }
}

/// Map the config file's level names (`INFO`, `WARNING`, ...) onto filter directives.
fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "" => "info".to_string(),
        other => other.to_string(),
    }
}

/// Install a stderr subscriber at `log_level`, ignoring "already installed".
pub fn init_tracing(log_level: Option<&str>) {
    if let Ok(logger) = Logger::new(None, log_level) {
        let _ = logger.install();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_creation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("logs").join("portal.log");

        let logger = Logger::new(Some(&log_path), Some("DEBUG")).unwrap();
        assert_eq!(logger.log_file(), Some(log_path.as_path()));
        assert_eq!(logger.log_level(), "debug");
        assert!(log_path.parent().unwrap().exists());
    }

    #[test]
    fn test_level_normalization() {
        assert_eq!(normalize_level("WARNING"), "warn");
        assert_eq!(normalize_level("CRITICAL"), "error");
        assert_eq!(normalize_level("Info"), "info");
        assert_eq!(normalize_level(""), "info");
    }

    #[test]
    fn test_default_level() {
        let logger = Logger::new(None, None).unwrap();
        assert!(logger.log_file().is_none());
        assert_eq!(logger.log_level(), "info");
    }
}
