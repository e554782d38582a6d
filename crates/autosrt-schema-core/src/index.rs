//! Unique index declarations and their comparable shape.

use std::fmt;

use bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::filter::SoftDeleteFilter;
use crate::names::{CollectionName, FieldName};

/// A unique index over a single field of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Collection the index belongs to.
    pub collection: CollectionName,

    /// Indexed field (ascending).
    pub field: FieldName,

    /// Whether the index enforces uniqueness.
    #[serde(default = "default_unique")]
    pub unique: bool,

    /// Soft-delete filter restricting which documents the index covers.
    #[serde(default)]
    pub partial_filter: Option<SoftDeleteFilter>,
}

fn default_unique() -> bool {
    true
}

impl IndexSpec {
    /// Declare a unique index without a partial filter.
    #[must_use]
    pub fn unique(collection: CollectionName, field: FieldName) -> Self {
        Self {
            collection,
            field,
            unique: true,
            partial_filter: None,
        }
    }

    /// Restrict the index to documents that are not soft-deleted.
    #[must_use]
    pub fn with_partial_filter(mut self, filter: SoftDeleteFilter) -> Self {
        self.partial_filter = Some(filter);
        self
    }

    /// The store's default name for an ascending single-field index.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}_1", self.field)
    }

    /// The definition the store is expected to hold once the index exists.
    #[must_use]
    pub fn definition(&self) -> IndexDefinition {
        IndexDefinition {
            name: self.name(),
            keys: doc! { self.field.as_str(): 1_i32 },
            unique: self.unique,
            partial_filter: self.partial_filter.map(SoftDeleteFilter::to_document),
        }
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.unique { "unique" } else { "non-unique" };
        write!(f, "{}.{} ({kind}", self.collection, self.field)?;
        if let Some(filter) = self.partial_filter {
            write!(f, ", deleted_at {filter}")?;
        }
        f.write_str(")")
    }
}

/// An index as the store describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,

    /// Key pattern, e.g. `{ email: 1 }`.
    pub keys: Document,

    /// Whether the index enforces uniqueness.
    pub unique: bool,

    /// Partial filter expression, if any.
    pub partial_filter: Option<Document>,
}

/// How a declared index relates to the indexes already in a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexState {
    /// No index shares the declared name or key pattern.
    Missing,
    /// An index with identical name, keys and options exists.
    Identical,
    /// An index shares the name or key pattern but differs otherwise.
    Conflicting(IndexDefinition),
}

impl IndexDefinition {
    /// Key pattern as `(field, direction)` pairs.
    ///
    /// Directions are normalised to integers so that `{ email: 1 }` written by
    /// the mongo shell (a double) compares equal to one written as `Int32`.
    #[must_use]
    pub fn key_pattern(&self) -> Vec<(String, i64)> {
        self.keys
            .iter()
            .map(|(field, direction)| (field.clone(), normalise_direction(direction)))
            .collect()
    }

    /// The fields covered by this index, in key order.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).collect()
    }

    /// Whether `other` describes the same index with the same options.
    #[must_use]
    pub fn matches(&self, other: &IndexDefinition) -> bool {
        self.name == other.name
            && self.key_pattern() == other.key_pattern()
            && self.unique == other.unique
            && self.partial_filter == other.partial_filter
    }

    /// Compare this (declared) definition against the indexes in a collection.
    #[must_use]
    pub fn state_in(&self, existing: &[IndexDefinition]) -> IndexState {
        let pattern = self.key_pattern();
        let related = existing
            .iter()
            .filter(|index| index.name == self.name || index.key_pattern() == pattern);

        let mut state = IndexState::Missing;
        for index in related {
            if self.matches(index) {
                state = IndexState::Identical;
            } else {
                return IndexState::Conflicting(index.clone());
            }
        }
        state
    }
}

impl fmt::Display for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} unique={}", self.name, self.keys, self.unique)?;
        if let Some(filter) = &self.partial_filter {
            write!(f, " partialFilterExpression={filter}")?;
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn normalise_direction(direction: &Bson) -> i64 {
    match direction {
        Bson::Int32(n) => i64::from(*n),
        Bson::Int64(n) => *n,
        Bson::Double(n) => *n as i64,
        // Text, hashed and geo indexes; never equal to an ascending key.
        _ => 0,
    }
}
