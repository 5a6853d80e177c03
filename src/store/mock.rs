//! Mock Storage Adapter
//!
//! In-memory adapter for running the portal without a database. Collections
//! are seeded at construction from the built-in portal fixtures or a JSON
//! fixture file; every mutation lives only as long as the process.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use super::query::QuerySpec;
use super::record::{validate_collection, validate_fields, Fields, Record, RecordSet};
use super::schema::SchemaSpec;
use super::traits::{AdapterKind, ProvisionReport, StorageAdapter, StoreError, StoreResult};

/// Seed data: collection name → ordered records
pub type FixtureSet = BTreeMap<String, Vec<Record>>;

#[derive(Debug, Default)]
struct MockCollection {
    records: Vec<Record>,
    next_id: u64,
}

impl MockCollection {
    fn seeded(records: Vec<Record>) -> Self {
        // An id with no successor cannot advance the counter.
        let highest = records
            .iter()
            .filter_map(|r| r.id.parse::<u64>().ok())
            .filter(|id| *id < u64::MAX)
            .max()
            .unwrap_or(0);
        Self {
            records,
            next_id: highest + 1,
        }
    }

    fn assign_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}

/// In-memory adapter over a fixture set.
#[derive(Debug)]
pub struct MockAdapter {
    collections: RwLock<BTreeMap<String, MockCollection>>,
    connected: AtomicBool,
}

impl MockAdapter {
    /// Adapter seeded with the built-in portal fixtures.
    pub fn new() -> Self {
        Self::with_fixtures(portal_fixtures())
    }

    /// Adapter seeded with `fixtures`.
    pub fn with_fixtures(fixtures: FixtureSet) -> Self {
        let collections = fixtures
            .into_iter()
            .map(|(name, records)| (name, MockCollection::seeded(records)))
            .collect();
        Self {
            collections: RwLock::new(collections),
            connected: AtomicBool::new(false),
        }
    }

    /// Adapter seeded from a JSON fixture file:
    /// `{ "<collection>": [ { "id": "...", ...fields } ] }`
    pub fn from_fixture_file(path: &Path) -> StoreResult<Self> {
        Ok(Self::with_fixtures(load_fixture_file(path)?))
    }

    fn ensure_connected(&self) -> StoreResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::NotConnected("mock"))
        }
    }

    fn read(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, MockCollection>>> {
        self.collections
            .read()
            .map_err(|_| StoreError::backend("mock store lock poisoned"))
    }

    fn write(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, MockCollection>>> {
        self.collections
            .write()
            .map_err(|_| StoreError::backend("mock store lock poisoned"))
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageAdapter for MockAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Mock
    }

    async fn connect(&self) -> StoreResult<()> {
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.connected.load(Ordering::Acquire) && self.collections.read().is_ok()
    }

    async fn list(&self, collection: &str, query: &QuerySpec) -> StoreResult<RecordSet> {
        self.ensure_connected()?;
        validate_collection(collection)?;
        query.validate()?;

        let collections = self.read()?;
        let Some(stored) = collections.get(collection) else {
            return Ok(RecordSet::default());
        };
        Ok(RecordSet::new(query.apply(stored.records.iter().cloned())))
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        self.ensure_connected()?;
        validate_collection(collection)?;

        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.records.iter().find(|r| r.id == id).cloned()))
    }

    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Record> {
        self.ensure_connected()?;
        validate_collection(collection)?;
        validate_fields(&fields)?;

        let mut collections = self.write()?;
        let stored = collections
            .entry(collection.to_string())
            .or_insert_with(|| MockCollection::seeded(Vec::new()));
        let record = Record::new(stored.assign_id(), fields);
        stored.records.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> StoreResult<Option<Record>> {
        self.ensure_connected()?;
        validate_collection(collection)?;
        validate_fields(&patch)?;

        let mut collections = self.write()?;
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(index) = stored.position(id) else {
            return Ok(None);
        };
        let record = &mut stored.records[index];
        record.apply_patch(patch);
        Ok(Some(record.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.ensure_connected()?;
        validate_collection(collection)?;

        let mut collections = self.write()?;
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match stored.position(id) {
            Some(index) => {
                stored.records.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn provision(&self, schema: &SchemaSpec) -> StoreResult<ProvisionReport> {
        schema.validate()?;
        Ok(ProvisionReport::skipped())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

/// Parse a JSON fixture file.
pub fn load_fixture_file(path: &Path) -> StoreResult<FixtureSet> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        StoreError::backend(format!(
            "failed to read fixture file {}: {}",
            path.display(),
            e
        ))
    })?;
    let fixtures: FixtureSet = serde_json::from_str(&content)?;
    for name in fixtures.keys() {
        validate_collection(name)?;
    }
    Ok(fixtures)
}

fn fixture(id: &str, value: serde_json::Value) -> Record {
    let fields = match value {
        serde_json::Value::Object(map) => map,
        _ => Fields::new(),
    };
    Record::new(id, fields)
}

/// Built-in simulated portal data.
pub fn portal_fixtures() -> FixtureSet {
    let mut fixtures = FixtureSet::new();
    fixtures.insert(
        "staff".to_string(),
        vec![
            fixture(
                "1",
                json!({"name": "Amelia Hart", "email": "amelia.hart@example.com", "department": "IT", "role": "admin", "active": true}),
            ),
            fixture(
                "2",
                json!({"name": "Ben Okafor", "email": "ben.okafor@example.com", "department": "Operations", "role": "technician", "active": true}),
            ),
            fixture(
                "3",
                json!({"name": "Chloe Martin", "email": "chloe.martin@example.com", "department": "Finance", "role": "staff", "active": false}),
            ),
        ],
    );
    fixtures.insert(
        "devices".to_string(),
        vec![
            fixture(
                "1",
                json!({"serial": "LT-1001", "type": "laptop", "model": "ThinkPad T14", "assigned_to": "1", "status": "in_use"}),
            ),
            fixture(
                "2",
                json!({"serial": "LT-1002", "type": "laptop", "model": "MacBook Air", "assigned_to": "2", "status": "in_use"}),
            ),
            fixture(
                "3",
                json!({"serial": "PR-2001", "type": "printer", "model": "LaserJet M404", "assigned_to": null, "status": "available"}),
            ),
        ],
    );
    fixtures.insert(
        "tickets".to_string(),
        vec![
            fixture(
                "1",
                json!({"title": "Printer jams on duplex", "device_id": "3", "status": "open", "priority": 2, "reported_by": "3"}),
            ),
            fixture(
                "2",
                json!({"title": "Laptop battery drains fast", "device_id": "1", "status": "in_progress", "priority": 1, "reported_by": "1"}),
            ),
        ],
    );
    fixtures
}
