//! Document Storage Adapter
//!
//! MongoDB/DocumentDB implementation. Each logical collection is a native
//! collection; records are documents whose `_id` is an `ObjectId`, exposed
//! at the adapter boundary as its 24-character hex string.
//!
//! ## Usage
//!
//! Enable the `storage-document` feature (on by default):
//!
//! ```toml
//! portal-store = { version = "0.3", features = ["storage-document"] }
//! ```
//!
//! ```rust,no_run
//! use portal_store::config::{Endpoint, Secret};
//! use portal_store::store::{DocumentAdapter, StorageAdapter};
//! use std::time::Duration;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let adapter = DocumentAdapter::new(
//!         Endpoint {
//!             host: "localhost".into(),
//!             port: 27017,
//!             user: String::new(),
//!             password: Secret::default(),
//!             database: "portal".into(),
//!         },
//!         Duration::from_secs(5),
//!     );
//!     adapter.connect().await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    error::ErrorKind,
    options::{
        ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
    },
    Client, Collection, IndexModel,
};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;

use super::query::{Condition, QuerySpec, SortDirection};
use super::record::{validate_collection, validate_fields, Fields, Record, RecordSet};
use super::schema::SchemaSpec;
use super::traits::{AdapterKind, ProvisionReport, StorageAdapter, StoreError, StoreResult};
use crate::config::Endpoint;

fn map_err(e: mongodb::error::Error) -> StoreError {
    match *e.kind {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::Authentication { .. }
        | ErrorKind::DnsResolve { .. } => StoreError::Connection(e.to_string()),
        _ => StoreError::Backend(e.to_string()),
    }
}

fn to_bson(value: &Value) -> StoreResult<Bson> {
    mongodb::bson::to_bson(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Match document equivalent to `query.filter`.
///
/// Every condition excludes array values, which MongoDB would otherwise
/// match element-wise.
pub(crate) fn filter_document(query: &QuerySpec) -> StoreResult<Document> {
    let mut filter = Document::new();
    for (field, condition) in &query.filter {
        let mut clause = Document::new();
        match condition {
            Condition::Eq(value) => {
                clause.insert("$eq", to_bson(value)?);
            }
            Condition::Range(range) => {
                for (op, bound) in range.bounds() {
                    clause.insert(op.mongo(), to_bson(bound)?);
                }
            }
        }
        clause.insert("$not", doc! { "$type": "array" });
        filter.insert(field.as_str(), clause);
    }
    Ok(filter)
}

/// Sort document; `_id` breaks ties so paging is stable.
pub(crate) fn sort_document(query: &QuerySpec) -> Document {
    let mut sort = Document::new();
    if let Some(key) = &query.sort {
        let direction = match key.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        sort.insert(key.field.as_str(), direction);
    }
    sort.insert("_id", 1);
    sort
}

fn find_options(query: &QuerySpec) -> FindOptions {
    FindOptions::builder()
        .sort(sort_document(query))
        .skip(query.offset.map(|o| o as u64))
        .limit(query.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)))
        .build()
}

/// Connection string for `endpoint`, credentials percent-encoded.
///
/// The database is not part of the URI, so credentials authenticate
/// against the server's default auth source.
pub(crate) fn connection_string(endpoint: &Endpoint, connect_timeout: Duration) -> String {
    let auth = if endpoint.user.is_empty() {
        String::new()
    } else {
        format!(
            "{}:{}@",
            urlencoding::encode(&endpoint.user),
            urlencoding::encode(endpoint.password.expose())
        )
    };
    let timeout_ms = connect_timeout.as_millis();
    format!(
        "mongodb://{}{}:{}/?appName=portal-store&connectTimeoutMS={}&serverSelectionTimeoutMS={}",
        auth, endpoint.host, endpoint.port, timeout_ms, timeout_ms
    )
}

fn document_to_record(mut doc: Document) -> StoreResult<Record> {
    let id = match doc.remove("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s,
        Some(other) => other.to_string(),
        None => {
            return Err(StoreError::Serialization(
                "document has no _id".to_string(),
            ))
        }
    };
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(fields) => Ok(Record::new(id, fields)),
        _ => Err(StoreError::Serialization(format!(
            "document {} is not an object",
            id
        ))),
    }
}

fn fields_to_document(fields: &Fields) -> StoreResult<Document> {
    mongodb::bson::to_document(fields).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// MongoDB/DocumentDB adapter
pub struct DocumentAdapter {
    endpoint: Endpoint,
    connect_timeout: Duration,
    client: RwLock<Option<Client>>,
}

impl DocumentAdapter {
    /// Create an adapter for `endpoint`. Nothing is opened until `connect`.
    pub fn new(endpoint: Endpoint, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
            client: RwLock::new(None),
        }
    }

    /// Endpoint description with the password redacted.
    pub fn endpoint(&self) -> String {
        format!("mongodb://{}", self.endpoint)
    }

    async fn collection(&self, name: &str) -> StoreResult<Collection<Document>> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(StoreError::NotConnected("document"))?;
        Ok(client
            .database(&self.endpoint.database)
            .collection::<Document>(name))
    }

    async fn database(&self) -> StoreResult<mongodb::Database> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(StoreError::NotConnected("document"))?;
        Ok(client.database(&self.endpoint.database))
    }
}

#[async_trait]
impl StorageAdapter for DocumentAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Document
    }

    async fn connect(&self) -> StoreResult<()> {
        let mut guard = self.client.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let uri = connection_string(&self.endpoint, self.connect_timeout);
        let client_options = ClientOptions::parse(uri.as_str())
            .await
            .map_err(|e| StoreError::Connection(format!("{}: {}", self.endpoint(), e)))?;
        let client = Client::with_options(client_options)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // The driver connects lazily; ping to surface bad hosts or credentials now.
        let db = client.database(&self.endpoint.database);
        let ping = db.run_command(doc! { "ping": 1 });
        match tokio::time::timeout(self.connect_timeout, ping).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(StoreError::Connection(format!("{}: {}", self.endpoint(), e)))
            }
            Err(_) => {
                return Err(StoreError::Connection(format!(
                    "timed out after {:?} connecting to {}",
                    self.connect_timeout,
                    self.endpoint()
                )))
            }
        }

        *guard = Some(client);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let Ok(db) = self.database().await else {
            return false;
        };
        db.run_command(doc! { "ping": 1 }).await.is_ok()
    }

    async fn list(&self, collection: &str, query: &QuerySpec) -> StoreResult<RecordSet> {
        validate_collection(collection)?;
        query.validate()?;
        let coll = self.collection(collection).await?;

        let mut cursor = coll
            .find(filter_document(query)?)
            .with_options(find_options(query))
            .await
            .map_err(map_err)?;

        let mut records = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(map_err)? {
            records.push(document_to_record(doc)?);
        }
        Ok(RecordSet::new(records))
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        validate_collection(collection)?;
        let coll = self.collection(collection).await?;
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        coll.find_one(doc! { "_id": oid })
            .await
            .map_err(map_err)?
            .map(document_to_record)
            .transpose()
    }

    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Record> {
        validate_collection(collection)?;
        validate_fields(&fields)?;
        let coll = self.collection(collection).await?;

        let result = coll
            .insert_one(fields_to_document(&fields)?)
            .await
            .map_err(map_err)?;
        let id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => {
                return Err(StoreError::backend(format!(
                    "unexpected inserted id {}",
                    other
                )))
            }
        };

        Ok(Record::new(id, fields))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> StoreResult<Option<Record>> {
        validate_collection(collection)?;
        validate_fields(&patch)?;
        let coll = self.collection(collection).await?;
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        if patch.is_empty() {
            return coll
                .find_one(doc! { "_id": oid })
                .await
                .map_err(map_err)?
                .map(document_to_record)
                .transpose();
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        coll.find_one_and_update(
            doc! { "_id": oid },
            doc! { "$set": fields_to_document(&patch)? },
        )
        .with_options(options)
        .await
        .map_err(map_err)?
        .map(document_to_record)
        .transpose()
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        validate_collection(collection)?;
        let coll = self.collection(collection).await?;
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(false);
        };

        let result = coll
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(map_err)?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self, collection: &str, query: &QuerySpec) -> StoreResult<usize> {
        if query.offset.is_some() || query.limit.is_some() {
            return Ok(self.list(collection, query).await?.len());
        }
        validate_collection(collection)?;
        query.validate()?;
        let coll = self.collection(collection).await?;
        let count = coll
            .count_documents(filter_document(query)?)
            .await
            .map_err(map_err)?;
        Ok(count as usize)
    }

    async fn provision(&self, schema: &SchemaSpec) -> StoreResult<ProvisionReport> {
        schema.validate()?;
        let db = self.database().await?;
        let provision_err = |e: mongodb::error::Error| StoreError::Provision(e.to_string());

        let existing = db.list_collection_names().await.map_err(provision_err)?;
        let mut report = ProvisionReport::default();

        for collection in &schema.collections {
            if !existing.iter().any(|name| name == &collection.name) {
                db.create_collection(&collection.name)
                    .await
                    .map_err(provision_err)?;
                report.collections_created.push(collection.name.clone());
            }

            let coll = db.collection::<Document>(&collection.name);
            let indexes = coll.list_index_names().await.map_err(provision_err)?;

            for index in &collection.indexes {
                let name = index.name_for(&collection.name);
                if indexes.contains(&name) {
                    continue;
                }

                let options = IndexOptions::builder()
                    .name(name.clone())
                    .unique(index.unique.then_some(true))
                    .build();
                let model = IndexModel::builder()
                    .keys(doc! { index.field.as_str(): 1 })
                    .options(options)
                    .build();

                coll.create_index(model)
                    .await
                    .map_err(|e| StoreError::Provision(format!("index {}: {}", name, e)))?;
                report.indexes_created.push(name);
            }
        }

        Ok(report)
    }

    async fn disconnect(&self) {
        let client = self.client.write().await.take();
        if let Some(client) = client {
            client.shutdown().await;
        }
    }
}
