//! The schema declaration applied at bootstrap time.
//!
//! A [`SchemaSpec`] is a static table: the target database, the collections
//! to create and the unique indexes to declare. Collections are always
//! applied before indexes, each kind in declaration order.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::filter::SoftDeleteFilter;
use crate::index::IndexSpec;
use crate::names::{CollectionName, FieldName};

/// Database the autosrt services read and write.
pub const AUTOSRT_DATABASE: &str = "autosrt";

/// Collections of the autosrt database, in creation order.
pub const AUTOSRT_COLLECTIONS: [&str; 4] = ["users", "usage", "customer", "subscription"];

/// Unique indexes of the autosrt database as `(collection, field)`, in creation order.
pub const AUTOSRT_UNIQUE_FIELDS: [(&str, &str); 5] = [
    ("users", "email"),
    ("users", "phone_number"),
    ("usage", "user_id"),
    ("customer", "customer_id"),
    ("subscription", "subscription_id"),
];

/// A collection to create if it does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: CollectionName,
}

impl CollectionSpec {
    /// Declare a collection.
    #[must_use]
    pub fn new(name: CollectionName) -> Self {
        Self { name }
    }
}

/// Full schema declaration for one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Target database name.
    pub database: String,

    /// Collections, in creation order.
    #[serde(default)]
    pub collections: Vec<CollectionSpec>,

    /// Unique indexes, in creation order.
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl SchemaSpec {
    /// The autosrt schema, with every unique index guarded by `filter`.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in table; the `Result` covers name validation.
    pub fn autosrt(filter: SoftDeleteFilter) -> Result<Self> {
        let collections = AUTOSRT_COLLECTIONS
            .iter()
            .map(|name| Ok(CollectionSpec::new(CollectionName::new(*name)?)))
            .collect::<Result<Vec<_>>>()?;

        let indexes = AUTOSRT_UNIQUE_FIELDS
            .iter()
            .map(|(collection, field)| {
                Ok(
                    IndexSpec::unique(CollectionName::new(*collection)?, FieldName::new(*field)?)
                        .with_partial_filter(filter),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            database: AUTOSRT_DATABASE.to_string(),
            collections,
            indexes,
        })
    }

    /// Parse a schema from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Parse` for malformed JSON or invalid names, and
    /// the validation errors of [`SchemaSpec::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load a schema from a JSON file and validate it.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Io` if the file cannot be read, otherwise the
    /// errors of [`SchemaSpec::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Target a different database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Indexes declared on `collection`, in declaration order.
    pub fn indexes_on<'a>(
        &'a self,
        collection: &'a CollectionName,
    ) -> impl Iterator<Item = &'a IndexSpec> + 'a {
        self.indexes
            .iter()
            .filter(move |index| &index.collection == collection)
    }

    /// Check that the declaration is internally consistent.
    ///
    /// # Errors
    ///
    /// - `SchemaError::EmptyDatabase` if no database is named.
    /// - `SchemaError::DuplicateCollection` if a collection appears twice.
    /// - `SchemaError::UnknownCollection` if an index targets an undeclared collection.
    /// - `SchemaError::DuplicateIndex` if two indexes on a collection share a name.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(SchemaError::EmptyDatabase);
        }

        let mut collections = HashSet::new();
        for collection in &self.collections {
            if !collections.insert(&collection.name) {
                return Err(SchemaError::DuplicateCollection {
                    collection: collection.name.to_string(),
                });
            }
        }

        let mut indexes = HashSet::new();
        for index in &self.indexes {
            let name = index.name();
            if !collections.contains(&index.collection) {
                return Err(SchemaError::UnknownCollection {
                    collection: index.collection.to_string(),
                    index: name,
                });
            }
            if !indexes.insert((&index.collection, name.clone())) {
                return Err(SchemaError::DuplicateIndex {
                    collection: index.collection.to_string(),
                    index: name,
                });
            }
        }

        Ok(())
    }
}
