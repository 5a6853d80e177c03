//! Entity records and name validation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

use super::traits::{StoreError, StoreResult};

/// Field name → scalar or nested value
pub type Fields = serde_json::Map<String, Value>;

/// Field names no caller may set; the adapter owns them.
pub const RESERVED_FIELDS: &[&str] = &["id", "_id"];

/// A logical business object (staff member, device, ticket).
///
/// Serializes flat: `{"id": "...", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Adapter-assigned id
    pub id: String,
    /// Business fields, never including the id
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Record with `id` and `fields`
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Value of a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Value at a dotted path (`address.city`). `id` resolves to the record id.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        if path == "id" {
            return Some(Value::String(self.id.clone()));
        }
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    /// Shallow merge: every top-level key in `patch` replaces the stored value.
    pub fn apply_patch(&mut self, patch: Fields) {
        for (key, value) in patch {
            self.fields.insert(key, value);
        }
    }
}

/// The finite result of a `list` call.
///
/// Iterating borrows, so the same set can be walked any number of times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Wrap materialized records
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Iterate without consuming
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids in result order
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Take the records
    pub fn into_vec(self) -> Vec<Record> {
        self.records
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("valid regex"))
}

fn field_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}(\.[A-Za-z_][A-Za-z0-9_]{0,63})*$")
            .expect("valid regex")
    })
}

/// Collection names become table names, so they must be plain identifiers.
pub fn validate_collection(name: &str) -> StoreResult<()> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "invalid collection name '{}'",
            name
        )))
    }
}

/// Field paths used in filters, sorts, and indexes: dotted identifiers.
pub fn validate_field_path(path: &str) -> StoreResult<()> {
    if field_path_regex().is_match(path) {
        Ok(())
    } else {
        Err(StoreError::validation(format!("invalid field path '{}'", path)))
    }
}

/// Fields written by `create`/`update` may not carry adapter-owned keys.
///
/// Top-level keys are stored literally, so keys a document store would read
/// as a path (`a.b`) or an operator (`$set`) are rejected everywhere.
pub fn validate_fields(fields: &Fields) -> StoreResult<()> {
    for reserved in RESERVED_FIELDS {
        if fields.contains_key(*reserved) {
            return Err(StoreError::validation(format!(
                "field '{}' is assigned by the adapter",
                reserved
            )));
        }
    }
    for key in fields.keys() {
        if key.is_empty() || key.contains('.') || key.starts_with('$') {
            return Err(StoreError::validation(format!("invalid field name '{}'", key)));
        }
    }
    Ok(())
}
