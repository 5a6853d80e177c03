//! Data Access Facade
//!
//! Single entry point for the portal's data operations. [`DataAccess`]
//! resolves configuration, activates exactly one adapter, and delegates every
//! operation to it.
//!
//! ## Adapter selection
//!
//! ```text
//!  resolve(config)
//!       │
//!       ▼
//!  mode is live and relational configured? ──yes──► connect ──ok──► Relational
//!       │ no                                          │ err
//!       ▼                                             ▼
//!  document configured? ──────────────────yes──► connect ──ok──► Document
//!       │ no                                          │ err
//!       ▼                                             ▼
//!  Mock (always succeeds) ◄───────────────────────────┘
//! ```
//!
//! A connection failure never escapes `initialize`; it is recorded in the
//! [`SelectionReport`] and the next tier is tried. Only configuration errors
//! are fatal.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::config::{resolve, BackendMode, ConfigError, ConfigLayers, ConnectionDescriptor};
use crate::observability::events;
use crate::store::{
    AdapterKind, Fields, MockAdapter, ProvisionReport, QuerySpec, Record, RecordSet, SchemaSpec,
    StorageAdapter, StoreError, StoreResult,
};

#[cfg(feature = "storage-document")]
use crate::store::DocumentAdapter;
#[cfg(feature = "storage-relational")]
use crate::store::RelationalAdapter;

const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// No adapter could be activated.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    /// Configuration is structurally invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Every tier, including the mock adapter, failed
    #[error("No adapter could be activated: {0}")]
    NoAdapter(String),
}

/// Why the active adapter was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionReason {
    /// The configured mode's primary target
    Configured,
    /// A higher tier failed to connect
    Fallback,
}

impl SelectionReason {
    /// Lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::Configured => "configured",
            SelectionReason::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tier that was tried and failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierAttempt {
    /// Adapter that was tried
    pub kind: AdapterKind,
    /// Redacted endpoint
    pub endpoint: String,
    /// Why it failed
    pub error: String,
}

/// Outcome of adapter selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionReport {
    /// Requested mode
    pub mode: BackendMode,
    /// Adapter that was activated
    pub kind: AdapterKind,
    /// Why it was activated
    pub reason: SelectionReason,
    /// Failed tiers, in the order they were tried
    pub attempts: Vec<TierAttempt>,
}

/// The active adapter, dispatched by variant.
pub enum ActiveAdapter {
    /// MySQL or SQLite
    #[cfg(feature = "storage-relational")]
    Relational(RelationalAdapter),
    /// MongoDB/DocumentDB
    #[cfg(feature = "storage-document")]
    Document(DocumentAdapter),
    /// In-memory fixtures
    Mock(MockAdapter),
}

macro_rules! dispatch {
    ($self:ident, $adapter:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "storage-relational")]
            ActiveAdapter::Relational($adapter) => $call,
            #[cfg(feature = "storage-document")]
            ActiveAdapter::Document($adapter) => $call,
            ActiveAdapter::Mock($adapter) => $call,
        }
    };
}

#[async_trait]
impl StorageAdapter for ActiveAdapter {
    fn kind(&self) -> AdapterKind {
        dispatch!(self, a => a.kind())
    }

    async fn connect(&self) -> StoreResult<()> {
        dispatch!(self, a => a.connect().await)
    }

    async fn health_check(&self) -> bool {
        dispatch!(self, a => a.health_check().await)
    }

    async fn list(&self, collection: &str, query: &QuerySpec) -> StoreResult<RecordSet> {
        dispatch!(self, a => a.list(collection, query).await)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        dispatch!(self, a => a.get(collection, id).await)
    }

    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Record> {
        dispatch!(self, a => a.create(collection, fields).await)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> StoreResult<Option<Record>> {
        dispatch!(self, a => a.update(collection, id, patch).await)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        dispatch!(self, a => a.delete(collection, id).await)
    }

    async fn provision(&self, schema: &SchemaSpec) -> StoreResult<ProvisionReport> {
        dispatch!(self, a => a.provision(schema).await)
    }

    async fn disconnect(&self) {
        dispatch!(self, a => a.disconnect().await)
    }

    async fn count(&self, collection: &str, query: &QuerySpec) -> StoreResult<usize> {
        dispatch!(self, a => a.count(collection, query).await)
    }
}

struct ActiveState {
    adapter: Arc<ActiveAdapter>,
    report: SelectionReport,
    grace: Duration,
}

/// Facade over the one active storage adapter.
///
/// Data operations run concurrently; only `initialize` and `shutdown` are
/// serialized.
pub struct DataAccess {
    state: RwLock<Option<ActiveState>>,
    lifecycle: Mutex<()>,
}

impl DataAccess {
    /// An uninitialized facade. Every operation fails with
    /// [`StoreError::NotReady`] until [`DataAccess::initialize`] succeeds.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Resolve `layers` and activate an adapter.
    ///
    /// Calling it again shuts the current adapter down first.
    pub async fn initialize(&self, layers: &ConfigLayers) -> Result<(), FatalError> {
        let descriptor = resolve(layers)?;
        self.initialize_with(&descriptor).await
    }

    /// Activate an adapter for an already resolved descriptor.
    pub async fn initialize_with(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<(), FatalError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.shutdown_locked().await;

        let (adapter, report) = select_adapter(descriptor).await?;
        *self.state.write().await = Some(ActiveState {
            adapter: Arc::new(adapter),
            report,
            grace: descriptor.shutdown_grace(),
        });
        Ok(())
    }

    /// Whether an adapter is active
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// How the active adapter was chosen, if initialized
    pub async fn selection(&self) -> Option<SelectionReport> {
        self.state.read().await.as_ref().map(|s| s.report.clone())
    }

    /// Kind of the active adapter, if initialized
    pub async fn active_kind(&self) -> Option<AdapterKind> {
        self.state.read().await.as_ref().map(|s| s.report.kind)
    }

    /// Liveness of the active adapter; false before initialization.
    pub async fn health_check(&self) -> bool {
        match self.adapter().await {
            Ok(adapter) => adapter.health_check().await,
            Err(_) => false,
        }
    }

    async fn adapter(&self) -> StoreResult<Arc<ActiveAdapter>> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.adapter))
            .ok_or(StoreError::NotReady)
    }

    /// List `collection` records matching `query`
    pub async fn list(&self, collection: &str, query: &QuerySpec) -> StoreResult<RecordSet> {
        self.adapter().await?.list(collection, query).await
    }

    /// Fetch one record by id
    pub async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        self.adapter().await?.get(collection, id).await
    }

    /// Insert a record; the adapter assigns its id
    pub async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Record> {
        self.adapter().await?.create(collection, fields).await
    }

    /// Shallow-merge `patch` into a record
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> StoreResult<Option<Record>> {
        self.adapter().await?.update(collection, id, patch).await
    }

    /// Delete a record; false if it did not exist
    pub async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.adapter().await?.delete(collection, id).await
    }

    /// Number of records matching `query`
    pub async fn count(&self, collection: &str, query: &QuerySpec) -> StoreResult<usize> {
        self.adapter().await?.count(collection, query).await
    }

    /// Provision `schema` on the active adapter.
    pub async fn provision(&self, schema: &SchemaSpec) -> StoreResult<ProvisionReport> {
        let adapter = self.adapter().await?;
        crate::provision::provision(adapter.as_ref(), schema).await
    }

    /// Stop accepting operations, wait up to the grace period for in-flight
    /// ones, then disconnect. Safe to call more than once.
    pub async fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.shutdown_locked().await;
    }

    async fn shutdown_locked(&self) {
        let Some(state) = self.state.write().await.take() else {
            return;
        };

        let deadline = tokio::time::Instant::now() + state.grace;
        // The only other holders of the Arc are running operations.
        while Arc::strong_count(&state.adapter) > 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(SHUTDOWN_POLL).await;
        }
        let in_flight = Arc::strong_count(&state.adapter) - 1;

        state.adapter.disconnect().await;
        events::adapter_shutdown(state.report.kind.as_str(), in_flight, state.grace);
    }
}

impl Default for DataAccess {
    fn default() -> Self {
        Self::new()
    }
}

fn record_failure(attempts: &mut Vec<TierAttempt>, kind: AdapterKind, endpoint: String, error: String) {
    events::connect_failed(kind.as_str(), &endpoint, &error);
    attempts.push(TierAttempt {
        kind,
        endpoint,
        error,
    });
}

fn finish(
    descriptor: &ConnectionDescriptor,
    adapter: ActiveAdapter,
    attempts: Vec<TierAttempt>,
) -> (ActiveAdapter, SelectionReport) {
    let reason = if attempts.is_empty() {
        SelectionReason::Configured
    } else {
        SelectionReason::Fallback
    };
    let kind = adapter.kind();
    events::adapter_selected(kind.as_str(), reason.as_str(), attempts.len());
    (
        adapter,
        SelectionReport {
            mode: descriptor.mode(),
            kind,
            reason,
            attempts,
        },
    )
}

/// Walk the tiers: relational, then document, then mock.
async fn select_adapter(
    descriptor: &ConnectionDescriptor,
) -> Result<(ActiveAdapter, SelectionReport), FatalError> {
    let mut attempts = Vec::new();

    if descriptor.mode().is_live() {
        if let Some(target) = descriptor.relational() {
            #[cfg(feature = "storage-relational")]
            {
                let adapter = RelationalAdapter::new(target.clone(), descriptor.connect_timeout());
                match adapter.connect().await {
                    Ok(()) => {
                        return Ok(finish(
                            descriptor,
                            ActiveAdapter::Relational(adapter),
                            attempts,
                        ))
                    }
                    Err(e) => record_failure(
                        &mut attempts,
                        AdapterKind::Relational,
                        adapter.endpoint(),
                        e.to_string(),
                    ),
                }
            }
            #[cfg(not(feature = "storage-relational"))]
            {
                events::tier_unavailable(AdapterKind::Relational.as_str());
                attempts.push(TierAttempt {
                    kind: AdapterKind::Relational,
                    endpoint: target.endpoint.to_string(),
                    error: "relational support not compiled in".to_string(),
                });
            }
        }

        if let Some(endpoint) = descriptor.document() {
            #[cfg(feature = "storage-document")]
            {
                let adapter = DocumentAdapter::new(endpoint.clone(), descriptor.connect_timeout());
                match adapter.connect().await {
                    Ok(()) => {
                        return Ok(finish(descriptor, ActiveAdapter::Document(adapter), attempts))
                    }
                    Err(e) => record_failure(
                        &mut attempts,
                        AdapterKind::Document,
                        adapter.endpoint(),
                        e.to_string(),
                    ),
                }
            }
            #[cfg(not(feature = "storage-document"))]
            {
                events::tier_unavailable(AdapterKind::Document.as_str());
                attempts.push(TierAttempt {
                    kind: AdapterKind::Document,
                    endpoint: endpoint.to_string(),
                    error: "document support not compiled in".to_string(),
                });
            }
        }
    }

    let mock = mock_adapter(descriptor);
    mock.connect()
        .await
        .map_err(|e| FatalError::NoAdapter(e.to_string()))?;
    Ok(finish(descriptor, ActiveAdapter::Mock(mock), attempts))
}

fn mock_adapter(descriptor: &ConnectionDescriptor) -> MockAdapter {
    let Some(path) = descriptor.fixtures() else {
        return MockAdapter::new();
    };
    match MockAdapter::from_fixture_file(path) {
        Ok(adapter) => adapter,
        Err(e) => {
            events::fixtures_fallback(&path.display().to_string(), &e.to_string());
            MockAdapter::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::events::capture::scoped;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn unreachable_relational() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DB_MODE", "relational"),
            ("DB_HOST", "127.0.0.1"),
            ("DB_PORT", "1"),
            ("DB_USER", "portal"),
            ("DB_NAME", "portal"),
            ("DB_CONNECT_TIMEOUT_SECS", "1"),
        ]
    }

    #[tokio::test]
    async fn test_operations_before_initialize_are_not_ready() {
        let data = DataAccess::new();
        assert!(!data.is_ready().await);
        assert!(!data.health_check().await);
        assert!(data.selection().await.is_none());
        assert!(matches!(
            data.list("staff", &QuerySpec::new()).await,
            Err(StoreError::NotReady)
        ));
        assert!(matches!(
            data.create("staff", Fields::new()).await,
            Err(StoreError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_mock_mode_serves_fixtures() {
        let data = DataAccess::new();
        data.initialize(&ConfigLayers::from_pairs([("DB_MODE", "mock")]))
            .await
            .unwrap();

        let report = data.selection().await.unwrap();
        assert_eq!(report.kind, AdapterKind::Mock);
        assert_eq!(report.reason, SelectionReason::Configured);
        assert!(report.attempts.is_empty());

        let staff = data.list("staff", &QuerySpec::new()).await.unwrap();
        assert_eq!(staff.ids(), vec!["1", "2", "3"]);

        let created = data
            .create("staff", fields(json!({"name": "Dev Patel"})))
            .await
            .unwrap();
        assert!(!staff.ids().contains(&created.id));
        let fetched = data.get("staff", &created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
        assert_eq!(data.count("staff", &QuerySpec::new()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_unreachable_relational_falls_back_to_mock() {
        let (writer, _guard) = scoped();
        let data = DataAccess::new();
        data.initialize(&ConfigLayers::from_pairs(unreachable_relational()))
            .await
            .expect("initialize never fails on connection errors");

        let report = data.selection().await.unwrap();
        assert_eq!(report.kind, AdapterKind::Mock);
        assert_eq!(report.reason, SelectionReason::Fallback);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].kind, AdapterKind::Relational);

        let output = writer.contents();
        assert!(output.contains("adapter selected"));
        assert!(output.contains("fallback"));
        assert!(!data.list("staff", &QuerySpec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_document_tier_is_tried_next() {
        let mut env = unreachable_relational();
        env.extend([
            ("DOC_DB_HOST", "127.0.0.1"),
            ("DOC_DB_PORT", "1"),
            ("DOC_DB_NAME", "portal"),
        ]);
        let data = DataAccess::new();
        data.initialize(&ConfigLayers::from_pairs(env)).await.unwrap();

        let report = data.selection().await.unwrap();
        assert_eq!(report.kind, AdapterKind::Mock);
        let tried: Vec<_> = report.attempts.iter().map(|a| a.kind).collect();
        assert_eq!(tried, vec![AdapterKind::Relational, AdapterKind::Document]);
    }

    #[tokio::test]
    async fn test_configuration_error_is_fatal() {
        let data = DataAccess::new();
        let result = data
            .initialize(&ConfigLayers::from_pairs([("DB_MODE", "relational")]))
            .await;
        assert!(matches!(result, Err(FatalError::Configuration(_))));
        assert!(!data.is_ready().await);
    }

    #[tokio::test]
    async fn test_bad_fixture_file_uses_builtin_fixtures() {
        let data = DataAccess::new();
        data.initialize(&ConfigLayers::from_pairs([
            ("DB_MODE", "mock"),
            ("DB_FIXTURES", "/nonexistent/fixtures.json"),
        ]))
        .await
        .unwrap();
        assert_eq!(data.count("devices", &QuerySpec::new()).await.unwrap(), 3);
    }

    #[cfg(feature = "storage-relational")]
    #[tokio::test]
    async fn test_sqlite_relational_is_selected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.db");
        let path = path.to_string_lossy().to_string();

        let data = DataAccess::new();
        data.initialize(&ConfigLayers::from_pairs([
            ("DB_MODE", "relational"),
            ("DB_DRIVER", "sqlite"),
            ("DB_NAME", path.as_str()),
        ]))
        .await
        .unwrap();

        let report = data.selection().await.unwrap();
        assert_eq!(report.kind, AdapterKind::Relational);
        assert_eq!(report.reason, SelectionReason::Configured);
        assert!(data.health_check().await);

        let created = data
            .create("tickets", fields(json!({"title": "Dock flicker", "status": "open"})))
            .await
            .unwrap();
        let fetched = data.get("tickets", &created.id).await.unwrap();
        assert_eq!(fetched, Some(created));

        data.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_operations() {
        let data = DataAccess::new();
        data.initialize_with(&ConnectionDescriptor::mock()).await.unwrap();
        data.shutdown().await;
        data.shutdown().await;

        assert!(!data.is_ready().await);
        assert!(matches!(
            data.get("staff", "1").await,
            Err(StoreError::NotReady)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_grace_period() {
        let data = DataAccess::new();
        data.initialize_with(&ConnectionDescriptor::mock()).await.unwrap();

        // Simulates an operation still running.
        let held = data.adapter().await.unwrap();
        let started = tokio::time::Instant::now();
        data.shutdown().await;

        assert!(started.elapsed() >= ConnectionDescriptor::mock().shutdown_grace());
        assert!(matches!(
            held.get("staff", "1").await,
            Err(StoreError::NotConnected("mock"))
        ));
    }

    #[tokio::test]
    async fn test_reinitialize_replaces_adapter() {
        let data = DataAccess::new();
        data.initialize_with(&ConnectionDescriptor::mock()).await.unwrap();
        data.create("staff", fields(json!({"name": "Temp"}))).await.unwrap();
        assert_eq!(data.count("staff", &QuerySpec::new()).await.unwrap(), 4);

        data.initialize_with(&ConnectionDescriptor::mock()).await.unwrap();
        assert_eq!(data.count("staff", &QuerySpec::new()).await.unwrap(), 3);
    }
}
