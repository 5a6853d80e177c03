//! Collections and indexes to provision.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::record::{validate_collection, validate_field_path};
use super::traits::{StoreError, StoreResult};

/// Schema to provision: one entry per logical collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Collections in provisioning order
    #[serde(default)]
    pub collections: Vec<CollectionSpec>,
}

/// A logical collection (a table in the relational store)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Collection (table) name
    pub name: String,
    /// Indexes to create
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

/// Single-field index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Field path to index
    pub field: String,
    /// Reject duplicate values
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// Non-unique index on `field`
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: false,
        }
    }

    /// Unique index on `field`
    pub fn unique(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: true,
        }
    }

    /// Deterministic index name, e.g. `idx_staff_address_city`.
    pub fn name_for(&self, collection: &str) -> String {
        format!("idx_{}_{}", collection, self.field.replace('.', "_"))
    }
}

impl CollectionSpec {
    /// Collection `name` with `indexes`
    pub fn new(name: impl Into<String>, indexes: Vec<IndexSpec>) -> Self {
        Self {
            name: name.into(),
            indexes,
        }
    }
}

impl SchemaSpec {
    /// The portal's collections: staff, devices, tickets.
    pub fn portal_default() -> Self {
        Self {
            collections: vec![
                CollectionSpec::new(
                    "staff",
                    vec![IndexSpec::unique("email"), IndexSpec::new("department")],
                ),
                CollectionSpec::new(
                    "devices",
                    vec![IndexSpec::unique("serial"), IndexSpec::new("assigned_to")],
                ),
                CollectionSpec::new(
                    "tickets",
                    vec![IndexSpec::new("status"), IndexSpec::new("device_id")],
                ),
            ],
        }
    }

    /// Every name here ends up in DDL, so all of them are checked up front.
    ///
    /// Two indexes whose names collide (`address.city` and `address_city`)
    /// are rejected, since provisioning would skip the second one.
    pub fn validate(&self) -> StoreResult<()> {
        for collection in &self.collections {
            validate_collection(&collection.name)?;
            let mut names = HashSet::new();
            for index in &collection.indexes {
                validate_field_path(&index.field)?;
                let name = index.name_for(&collection.name);
                if !names.insert(name.clone()) {
                    return Err(StoreError::validation(format!(
                        "index '{}' on '{}' is declared twice (field '{}')",
                        name, collection.name, index.field
                    )));
                }
            }
        }
        Ok(())
    }

    /// Names of the declared collections
    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for SchemaSpec {
    fn default() -> Self {
        Self::portal_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_default() {
        let schema = SchemaSpec::portal_default();
        assert_eq!(schema.collection_names(), vec!["staff", "devices", "tickets"]);
        assert!(schema.validate().is_ok());
        assert!(schema.collections[0].indexes[0].unique);
    }

    #[test]
    fn test_index_name() {
        let index = IndexSpec::new("address.city");
        assert_eq!(index.name_for("staff"), "idx_staff_address_city");
    }

    #[test]
    fn test_validate_rejects_unsafe_names() {
        let schema = SchemaSpec {
            collections: vec![CollectionSpec::new("staff`; DROP", vec![])],
        };
        assert!(schema.validate().is_err());

        let schema = SchemaSpec {
            collections: vec![CollectionSpec::new(
                "staff",
                vec![IndexSpec::new("email') --")],
            )],
        };
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_colliding_index_names() {
        let schema = SchemaSpec {
            collections: vec![CollectionSpec::new(
                "staff",
                vec![IndexSpec::new("address.city"), IndexSpec::unique("address_city")],
            )],
        };
        assert!(matches!(schema.validate(), Err(StoreError::Validation(_))));

        // The same field in two collections is fine
        let schema = SchemaSpec {
            collections: vec![
                CollectionSpec::new("staff", vec![IndexSpec::new("email")]),
                CollectionSpec::new("contacts", vec![IndexSpec::new("email")]),
            ],
        };
        assert!(schema.validate().is_ok());
    }
}
