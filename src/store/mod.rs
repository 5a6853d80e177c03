//! Storage Adapter Abstraction
//!
//! This module provides the adapter contract shared by every backend, the
//! backend-agnostic record/query/schema types, and the three adapters.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │     DataAccess      │
//! │  (facade, fallback) │
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │   StorageAdapter    │  <-- Trait
//! │      (async)        │
//! └──────────┬──────────┘
//!            │
//!     ┌──────┼───────────┐
//!     │      │           │
//! ┌───▼────┐ ┌▼─────────┐ ┌▼─────┐
//! │Relation│ │ Document │ │ Mock │
//! │  -al   │ │ (Mongo)  │ │      │
//! └────────┘ └──────────┘ └──────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use portal_store::store::{MockAdapter, QuerySpec, StorageAdapter};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let adapter = MockAdapter::new();
//!     adapter.connect().await?;
//!
//!     let it_staff = adapter
//!         .list("staff", &QuerySpec::new().filter_eq("department", "IT"))
//!         .await?;
//!     for record in &it_staff {
//!         println!("{} {:?}", record.id, record.get("name"));
//!     }
//!     Ok(())
//! }
//! ```

mod mock;
mod query;
mod record;
mod schema;
mod traits;

pub use mock::*;
pub use query::*;
pub use record::*;
pub use schema::*;
pub use traits::*;

#[cfg(feature = "storage-relational")]
mod relational;

#[cfg(feature = "storage-relational")]
pub use relational::{connection_url, RelationalAdapter};

#[cfg(feature = "storage-document")]
mod document;

#[cfg(feature = "storage-document")]
pub use document::DocumentAdapter;
