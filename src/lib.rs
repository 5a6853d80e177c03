//! Portal Store - dual-backend data access layer for the staff/inventory portal
//!
//! Portal Store gives the portal one data API whether it runs against MySQL,
//! MongoDB/DocumentDB, or nothing at all:
//!
//! - **`config`** - Layered configuration and credential resolution
//! - **`observability`** - Structured logging and diagnostic events
//! - **`store`** - Adapter contract, query/schema types, and the adapters
//! - **`facade`** - `DataAccess`, which picks one adapter with fallback
//! - **`provision`** - Idempotent schema bootstrap
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! portal-store = "0.3"
//! # Mock only, no database drivers:
//! portal-store = { version = "0.3", default-features = false }
//! # MySQL/SQLite without MongoDB:
//! portal-store = { version = "0.3", default-features = false, features = ["storage-relational"] }
//! ```
//!
//! # Example: Initializing the facade
//!
//! ```ignore
//! use portal_store::config::{ConfigLayers, ConfigurationLoader, EnvironmentLoader};
//! use portal_store::facade::DataAccess;
//! use portal_store::store::QuerySpec;
//!
//! let env = EnvironmentLoader::new(None);
//! let file = ConfigurationLoader::new(None)?.config;
//! let layers = ConfigLayers::from_environment(&env, file);
//!
//! let data = DataAccess::new();
//! data.initialize(&layers).await?;
//! println!("active adapter: {:?}", data.active_kind().await);
//!
//! let open = data
//!     .list("tickets", &QuerySpec::new().filter_eq("status", "open"))
//!     .await?;
//! ```
//!
//! # Example: Running offline
//!
//! ```ignore
//! use portal_store::config::ConfigLayers;
//! use portal_store::facade::DataAccess;
//!
//! let data = DataAccess::new();
//! data.initialize(&ConfigLayers::from_pairs([("DB_MODE", "mock")])).await?;
//! let staff = data.list("staff", &Default::default()).await?;
//! assert_eq!(staff.len(), 3);
//! ```

#![warn(missing_docs)]

/// Configuration and credential resolution
pub mod config;

/// Logging and diagnostic events
pub mod observability;

/// Storage adapters
pub mod store;

/// Data access facade
pub mod facade;

/// Schema provisioning
pub mod provision;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        BackendMode, ConfigError, ConfigLayers, ConfigurationLoader, ConnectionDescriptor,
        EnvironmentLoader,
    };
    pub use crate::facade::{DataAccess, FatalError, SelectionReason, SelectionReport};
    pub use crate::observability::{init_tracing, Logger};
    pub use crate::provision::provision;
    pub use crate::store::{
        AdapterKind, Fields, MockAdapter, QuerySpec, Record, RecordSet, SchemaSpec, SortDirection,
        StorageAdapter, StoreError, StoreResult,
    };
}
