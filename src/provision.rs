//! Schema bootstrap.
//!
//! Creates the tables/collections and indexes a [`SchemaSpec`] declares when
//! they are absent. Safe to re-run: existing objects are left alone. On the
//! mock adapter it succeeds without doing anything.

use crate::config::{BackendMode, ConfigError, ConnectionDescriptor};
use crate::observability::events;
use crate::store::{
    MockAdapter, ProvisionReport, SchemaSpec, StorageAdapter, StoreError, StoreResult,
};

#[cfg(feature = "storage-document")]
use crate::store::DocumentAdapter;
#[cfg(feature = "storage-relational")]
use crate::store::RelationalAdapter;

/// Why a provisioning run against the primary target failed.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// Configuration could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The primary target could not be reached
    #[error("{0}")]
    Connection(StoreError),

    /// Creating tables, collections, or indexes failed
    #[error("{0}")]
    Provision(StoreError),
}

impl InitError {
    /// Process exit code for the `portal-init` binary
    pub fn exit_code(&self) -> u8 {
        match self {
            InitError::Config(_) => 1,
            InitError::Connection(_) => 2,
            InitError::Provision(_) => 3,
        }
    }
}

/// Provision `schema` on a connected adapter.
///
/// Failures surface as [`StoreError::Provision`], except for an adapter that
/// was never connected, which stays [`StoreError::NotConnected`].
pub async fn provision<A>(adapter: &A, schema: &SchemaSpec) -> StoreResult<ProvisionReport>
where
    A: StorageAdapter + ?Sized,
{
    let kind = adapter.kind();
    let report = adapter.provision(schema).await.map_err(|e| match e {
        StoreError::Provision(_) | StoreError::NotConnected(_) => e,
        other => StoreError::Provision(other.to_string()),
    })?;

    if report.skipped {
        events::provision_skipped(kind.as_str());
    } else {
        events::provisioned(
            kind.as_str(),
            report.collections_created.len(),
            report.indexes_created.len(),
        );
    }
    Ok(report)
}

/// Provision the descriptor's primary target, with no fallback.
///
/// Mock mode has no target; the run is reported as skipped.
pub async fn provision_primary(
    descriptor: &ConnectionDescriptor,
    schema: &SchemaSpec,
) -> Result<ProvisionReport, InitError> {
    match descriptor.mode() {
        BackendMode::Mock => {
            let adapter = MockAdapter::new();
            adapter.connect().await.map_err(InitError::Connection)?;
            provision(&adapter, schema)
                .await
                .map_err(InitError::Provision)
        }
        BackendMode::Relational => {
            let target = descriptor.relational().ok_or(ConfigError::MissingField {
                field: "host",
                key: "DB_HOST",
            })?;
            #[cfg(feature = "storage-relational")]
            {
                let adapter = RelationalAdapter::new(target.clone(), descriptor.connect_timeout());
                run_live(&adapter, schema).await
            }
            #[cfg(not(feature = "storage-relational"))]
            {
                let _ = target;
                Err(InitError::Connection(StoreError::Connection(
                    "relational support not compiled in".to_string(),
                )))
            }
        }
        BackendMode::Document => {
            let endpoint = descriptor.document().ok_or(ConfigError::MissingField {
                field: "host",
                key: "DB_HOST",
            })?;
            #[cfg(feature = "storage-document")]
            {
                let adapter = DocumentAdapter::new(endpoint.clone(), descriptor.connect_timeout());
                run_live(&adapter, schema).await
            }
            #[cfg(not(feature = "storage-document"))]
            {
                let _ = endpoint;
                Err(InitError::Connection(StoreError::Connection(
                    "document support not compiled in".to_string(),
                )))
            }
        }
    }
}

#[cfg(any(feature = "storage-relational", feature = "storage-document"))]
async fn run_live<A: StorageAdapter>(
    adapter: &A,
    schema: &SchemaSpec,
) -> Result<ProvisionReport, InitError> {
    adapter.connect().await.map_err(InitError::Connection)?;
    let result = provision(adapter, schema).await.map_err(InitError::Provision);
    adapter.disconnect().await;
    result
}
