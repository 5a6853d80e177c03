//! Observability utilities for the data access layer.
//!
//! Structured `tracing` events for configuration provenance, adapter
//! selection, and provisioning, plus a small [`Logger`] that installs the
//! subscriber for binaries.
//!
//! # Example
//!
//! ```no_run
//! use portal_store::observability::Logger;
//!
//! let logger = Logger::new(None, Some("DEBUG")).unwrap();
//! logger.install().unwrap();
//! ```

/// Named diagnostic events
pub mod events;
/// Subscriber setup
pub mod logger;

// Re-export main types for convenience
pub use logger::{init_tracing, Logger};
