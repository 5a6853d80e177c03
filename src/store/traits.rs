//! Storage Adapter Traits
//!
//! Defines the contract every backend adapter implements.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use super::query::QuerySpec;
use super::record::{Fields, Record, RecordSet};
use super::schema::SchemaSpec;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for storage operations.
///
/// A missing record is not an error: `get`/`update` return `None` and
/// `delete` returns `false`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable, timed out, or rejected the credentials
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation attempted on an adapter that is not connected
    #[error("Adapter not connected: {0}")]
    NotConnected(&'static str),

    /// Operation attempted before the facade finished initializing
    #[error("Data access layer is not initialized")]
    NotReady,

    /// Schema bootstrap failed
    #[error("Provision error: {0}")]
    Provision(String),

    /// Invalid collection name, field name, or filter value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend(message.into())
    }

    /// Whether this error should make the facade move to the next tier.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::NotConnected(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// The adapter implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// MySQL/SQLite adapter
    Relational,
    /// MongoDB/DocumentDB adapter
    Document,
    /// In-memory adapter
    Mock,
}

impl AdapterKind {
    /// Lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Relational => "relational",
            AdapterKind::Document => "document",
            AdapterKind::Mock => "mock",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a provisioning run changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Tables/collections created by this run
    pub collections_created: Vec<String>,
    /// Indexes created by this run
    pub indexes_created: Vec<String>,
    /// True when the adapter has nothing to provision (mock)
    pub skipped: bool,
}

impl ProvisionReport {
    /// Report for an adapter that has nothing to provision.
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    /// Whether the run changed nothing.
    pub fn is_noop(&self) -> bool {
        self.collections_created.is_empty() && self.indexes_created.is_empty()
    }
}

/// Core trait for backend adapters
///
/// Every adapter owns its session handle exclusively. Identifiers are
/// strings at this boundary; each adapter converts to and from its native
/// id type.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// The adapter kind
    fn kind(&self) -> AdapterKind;

    /// Establish the backend session. Calling it on a connected adapter
    /// keeps the existing session.
    async fn connect(&self) -> StoreResult<()>;

    /// Cheap liveness probe. Never fails; returns false on any error.
    async fn health_check(&self) -> bool;

    /// Records matching `query`, ordered by its sort key or backend default order.
    async fn list(&self, collection: &str, query: &QuerySpec) -> StoreResult<RecordSet>;

    /// Record by id, or `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Record>>;

    /// Store a new record and echo it back with its assigned id.
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Record>;

    /// Overwrite the top-level fields in `patch`. `None` if the record is absent.
    async fn update(&self, collection: &str, id: &str, patch: Fields)
        -> StoreResult<Option<Record>>;

    /// Remove a record. True if it existed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Create collections and indexes that do not exist yet.
    async fn provision(&self, schema: &SchemaSpec) -> StoreResult<ProvisionReport>;

    /// Release the session. Further calls are no-ops.
    async fn disconnect(&self);

    /// Number of records matching `query`
    async fn count(&self, collection: &str, query: &QuerySpec) -> StoreResult<usize> {
        Ok(self.list(collection, query).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Connection error: refused");
        assert!(err.is_connection());

        let err = StoreError::NotReady;
        assert_eq!(err.to_string(), "Data access layer is not initialized");
        assert!(!err.is_connection());
    }

    #[test]
    fn test_provision_report() {
        assert!(ProvisionReport::default().is_noop());
        assert!(ProvisionReport::skipped().skipped);

        let report = ProvisionReport {
            indexes_created: vec!["idx_staff_email".to_string()],
            ..Default::default()
        };
        assert!(!report.is_noop());
    }

    #[test]
    fn test_adapter_kind_names() {
        assert_eq!(AdapterKind::Relational.to_string(), "relational");
        assert_eq!(AdapterKind::Document.as_str(), "document");
        assert_eq!(AdapterKind::Mock.to_string(), "mock");
    }
}
