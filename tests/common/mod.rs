//! Behaviour every storage adapter must share.

#![allow(dead_code)]

use portal_store::store::{Fields, QuerySpec, Range, SortDirection, StorageAdapter, StoreError};
use serde_json::{json, Value};

pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().expect("object literal")
}

/// create → get returns the same record; update merges; delete → get is absent.
pub async fn crud_round_trip<A: StorageAdapter>(adapter: &A, collection: &str) {
    let created = adapter
        .create(
            collection,
            fields(json!({
                "name": "Priya Shah",
                "email": "priya.shah@example.com",
                "address": {"city": "Leeds", "zip": "LS1"},
                "tags": ["oncall", "network"],
                "active": true
            })),
        )
        .await
        .unwrap();
    assert!(!created.id.is_empty());

    let fetched = adapter.get(collection, &created.id).await.unwrap();
    assert_eq!(fetched.as_ref(), Some(&created));

    let updated = adapter
        .update(collection, &created.id, fields(json!({"active": false})))
        .await
        .unwrap()
        .expect("record exists");
    assert_eq!(updated.get("active"), Some(&json!(false)));
    assert_eq!(updated.get("name"), Some(&json!("Priya Shah")));
    assert_eq!(updated.lookup("address.city"), Some(json!("Leeds")));

    assert!(adapter.delete(collection, &created.id).await.unwrap());
    assert!(adapter.get(collection, &created.id).await.unwrap().is_none());
    assert!(!adapter.delete(collection, &created.id).await.unwrap());
    assert!(adapter
        .update(collection, &created.id, fields(json!({"active": true})))
        .await
        .unwrap()
        .is_none());
}

/// Ids that can never exist are absent, not errors.
pub async fn unknown_ids_are_absent<A: StorageAdapter>(adapter: &A, collection: &str) {
    assert!(adapter.get(collection, "does-not-exist").await.unwrap().is_none());
    assert!(!adapter.delete(collection, "does-not-exist").await.unwrap());
}

/// Only the exact id string an adapter returned names the record.
pub async fn non_canonical_ids_are_absent<A: StorageAdapter>(adapter: &A, collection: &str) {
    let created = adapter
        .create(collection, fields(json!({"name": "Omar Reyes"})))
        .await
        .unwrap();

    for alias in [format!("0{}", created.id), format!("+{}", created.id), format!(" {}", created.id)] {
        assert!(adapter.get(collection, &alias).await.unwrap().is_none(), "{alias}");
        assert!(!adapter.delete(collection, &alias).await.unwrap(), "{alias}");
        assert!(adapter
            .update(collection, &alias, fields(json!({"name": "changed"})))
            .await
            .unwrap()
            .is_none());
    }

    let fetched = adapter.get(collection, &created.id).await.unwrap();
    assert_eq!(fetched, Some(created));
}

/// Filters, sorting, and paging agree across adapters.
pub async fn query_semantics<A: StorageAdapter>(adapter: &A, collection: &str) {
    let rows = [
        json!({"name": "Carol", "dept": "IT", "age": 41, "address": {"city": "York"}}),
        json!({"name": "Alice", "dept": "HR", "age": 29, "address": {"city": "Leeds"}}),
        json!({"name": "Bob", "dept": "IT", "age": 35, "address": {"city": "Leeds"}}),
        json!({"name": "Dan", "dept": null}),
    ];
    let mut ids = Vec::new();
    for row in rows {
        ids.push(adapter.create(collection, fields(row)).await.unwrap().id);
    }

    let names = |set: portal_store::store::RecordSet| -> Vec<String> {
        set.iter()
            .map(|r| r.get("name").and_then(Value::as_str).unwrap_or("").to_string())
            .collect()
    };

    let it = adapter
        .list(collection, &QuerySpec::new().filter_eq("dept", "IT").sort_by("name", SortDirection::Asc))
        .await
        .unwrap();
    assert_eq!(names(it), vec!["Bob", "Carol"]);

    let no_dept = adapter
        .list(collection, &QuerySpec::new().filter_eq("dept", Value::Null))
        .await
        .unwrap();
    assert_eq!(names(no_dept), vec!["Dan"]);

    let leeds = adapter
        .list(
            collection,
            &QuerySpec::new()
                .filter_eq("address.city", "Leeds")
                .sort_by("age", SortDirection::Desc),
        )
        .await
        .unwrap();
    assert_eq!(names(leeds), vec!["Bob", "Alice"]);

    let thirties = adapter
        .list(
            collection,
            &QuerySpec::new().filter_range(
                "age",
                Range {
                    gte: Some(json!(30)),
                    lt: Some(json!(41)),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();
    assert_eq!(names(thirties), vec!["Bob"]);

    let page = adapter
        .list(
            collection,
            &QuerySpec::new()
                .filter_eq("dept", "IT")
                .sort_by("name", SortDirection::Asc)
                .offset(1)
                .limit(5),
        )
        .await
        .unwrap();
    assert_eq!(names(page), vec!["Carol"]);

    let count = adapter
        .count(collection, &QuerySpec::new().filter_eq("dept", "IT"))
        .await
        .unwrap();
    assert_eq!(count, 2);

    let everything = adapter.list(collection, &QuerySpec::new()).await.unwrap();
    assert_eq!(everything.ids(), ids);
}

/// Unsafe names never reach the backend.
pub async fn rejects_unsafe_names<A: StorageAdapter>(adapter: &A) {
    let err = adapter
        .list("staff; DROP TABLE staff", &QuerySpec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let err = adapter
        .list("staff", &QuerySpec::new().filter_eq("name') OR 1=1 --", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let err = adapter
        .create("staff", fields(json!({"id": "42", "name": "Mallory"})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    // Dotted and `$` keys mean paths or operators to a document store.
    let err = adapter
        .create("staff", fields(json!({"address.city": "Leeds"})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let err = adapter
        .create("staff", fields(json!({"$set": {"role": "admin"}})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let err = adapter
        .update("staff", "1", fields(json!({"a.b": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}
