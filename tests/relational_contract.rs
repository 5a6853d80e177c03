//! Relational adapter contract, run against SQLite through the same sqlx
//! `Any` code path the MySQL dialect uses.
//!
//! Run with: cargo test --test relational_contract

mod common;

use std::time::Duration;

use portal_store::config::{Endpoint, RelationalDriver, RelationalTarget, Secret};
use portal_store::provision::provision;
use portal_store::store::{
    CollectionSpec, IndexSpec, QuerySpec, RelationalAdapter, SchemaSpec, StorageAdapter,
    StoreError,
};
use serde_json::json;
use tempfile::TempDir;

fn sqlite_adapter(dir: &TempDir) -> RelationalAdapter {
    let path = dir.path().join("portal.db");
    RelationalAdapter::new(
        RelationalTarget {
            driver: RelationalDriver::Sqlite,
            endpoint: Endpoint {
                host: "localhost".into(),
                port: 0,
                user: String::new(),
                password: Secret::default(),
                database: path.to_string_lossy().to_string(),
            },
        },
        Duration::from_secs(5),
    )
}

async fn connected(dir: &TempDir) -> RelationalAdapter {
    let adapter = sqlite_adapter(dir);
    adapter.connect().await.expect("sqlite connects");
    adapter
}

#[tokio::test]
async fn test_crud_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    common::crud_round_trip(&adapter, "staff").await;
    common::unknown_ids_are_absent(&adapter, "staff").await;
    common::non_canonical_ids_are_absent(&adapter, "staff").await;
    adapter.disconnect().await;
}

#[tokio::test]
async fn test_query_semantics() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    common::query_semantics(&adapter, "people").await;
}

#[tokio::test]
async fn test_rejects_unsafe_names() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    common::rejects_unsafe_names(&adapter).await;
}

#[tokio::test]
async fn test_ids_are_assigned_by_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;

    let first = adapter
        .create("devices", common::fields(json!({"serial": "LT-1001"})))
        .await
        .unwrap();
    let second = adapter
        .create("devices", common::fields(json!({"serial": "LT-1002"})))
        .await
        .unwrap();
    assert_eq!(first.id, "1");
    assert_eq!(second.id, "2");
}

#[tokio::test]
async fn test_unknown_collection_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    let records = adapter.list("assets", &QuerySpec::new()).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_reads_do_not_create_tables() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;

    assert!(adapter.get("assets", "1").await.unwrap().is_none());
    assert!(!adapter.delete("assets", "1").await.unwrap());
    assert!(adapter
        .update("assets", "1", common::fields(json!({"tag": "x"})))
        .await
        .unwrap()
        .is_none());
    assert_eq!(adapter.count("assets", &QuerySpec::new()).await.unwrap(), 0);
    assert!(adapter.schema_objects().await.unwrap().is_empty());

    adapter
        .create("assets", common::fields(json!({"tag": "x"})))
        .await
        .unwrap();
    assert_eq!(
        adapter.schema_objects().await.unwrap(),
        vec!["table:assets".to_string()]
    );
}

#[tokio::test]
async fn test_connect_twice_keeps_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    let created = adapter
        .create("staff", common::fields(json!({"name": "A"})))
        .await
        .unwrap();

    adapter.connect().await.unwrap();
    assert!(adapter.health_check().await);
    assert_eq!(adapter.get("staff", &created.id).await.unwrap(), Some(created));
}

#[tokio::test]
async fn test_provision_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    let schema = SchemaSpec::portal_default();

    let first = provision(&adapter, &schema).await.unwrap();
    assert_eq!(first.collections_created.len(), 3);
    assert!(first
        .indexes_created
        .contains(&"idx_staff_email".to_string()));
    let objects = adapter.schema_objects().await.unwrap();

    let second = provision(&adapter, &schema).await.unwrap();
    assert!(second.is_noop());
    assert_eq!(adapter.schema_objects().await.unwrap(), objects);
    assert!(objects.contains(&"table:tickets".to_string()));
    assert!(objects.contains(&"index:idx_devices_serial".to_string()));
}

#[tokio::test]
async fn test_provision_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let schema = SchemaSpec::portal_default();

    let adapter = connected(&dir).await;
    provision(&adapter, &schema).await.unwrap();
    adapter.disconnect().await;

    let adapter = connected(&dir).await;
    let report = provision(&adapter, &schema).await.unwrap();
    assert!(report.is_noop());
}

#[tokio::test]
async fn test_unique_index_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    let schema = SchemaSpec {
        collections: vec![CollectionSpec::new("staff", vec![IndexSpec::unique("email")])],
    };
    provision(&adapter, &schema).await.unwrap();

    adapter
        .create("staff", common::fields(json!({"email": "a@example.com"})))
        .await
        .unwrap();
    let err = adapter
        .create("staff", common::fields(json!({"email": "a@example.com"})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));
}

#[tokio::test]
async fn test_colliding_index_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    let schema = SchemaSpec {
        collections: vec![CollectionSpec::new(
            "staff",
            vec![IndexSpec::new("address.city"), IndexSpec::unique("address_city")],
        )],
    };
    let err = provision(&adapter, &schema).await.unwrap_err();
    assert!(matches!(err, StoreError::Provision(_)));
    assert!(adapter.schema_objects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = connected(&dir).await;
    assert!(adapter.health_check().await);

    adapter.disconnect().await;
    adapter.disconnect().await;
    assert!(!adapter.health_check().await);
    assert!(matches!(
        adapter.list("staff", &QuerySpec::new()).await,
        Err(StoreError::NotConnected(_))
    ));
}
