//! In-memory catalog implementation.
//!
//! Mirrors the behaviour of the document store closely enough to exercise
//! schema declarations: idempotent creates, index conflict detection, and
//! unique indexes honouring their partial filter. A missing indexed field is
//! treated as `null`, as the store does.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use bson::{Bson, DateTime, Document};
use autosrt_schema_core::{
    get_path, matches_filter, CollectionName, FieldName, IndexDefinition, IndexSpec, IndexState,
    SoftDeleteFilter, DELETED_AT,
};

use crate::error::{Result, StoreError};
use crate::{Catalog, CollectionStatus};

/// Simulated failure applied to every operation of a [`MemoryCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Every operation fails with `StoreError::Connection`.
    Unreachable,
    /// Reads succeed; writes fail with `StoreError::Unauthorized`.
    ReadOnly,
    /// Every operation waits this long before running.
    Stall(Duration),
}

#[derive(Debug, Default)]
struct CollectionState {
    indexes: Vec<IndexDefinition>,
    documents: Vec<Document>,
}

/// Catalog kept entirely in process memory.
#[derive(Debug)]
pub struct MemoryCatalog {
    database: String,
    collections: Mutex<BTreeMap<String, CollectionState>>,
    failure: Option<FailureMode>,
}

impl MemoryCatalog {
    /// Create an empty catalog for `database`.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Mutex::new(BTreeMap::new()),
            failure: None,
        }
    }

    /// Apply a simulated failure to every subsequent operation.
    #[must_use]
    pub fn with_failure(mut self, failure: FailureMode) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Install an index definition as-is, bypassing conflict checks.
    ///
    /// Used to stage a store that already holds a differently configured index.
    pub async fn seed_index(&self, collection: &CollectionName, definition: IndexDefinition) {
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .indexes
            .push(definition);
    }

    /// Snapshot of the documents stored in `collection`.
    pub async fn documents(&self, collection: &CollectionName) -> Vec<Document> {
        let collections = self.collections.lock().await;
        collections
            .get(collection.as_str())
            .map(|state| state.documents.clone())
            .unwrap_or_default()
    }

    async fn check(&self, write: bool) -> Result<()> {
        match self.failure {
            Some(FailureMode::Unreachable) => Err(StoreError::Connection(format!(
                "no reachable servers for database {}",
                self.database
            ))),
            Some(FailureMode::ReadOnly) if write => Err(StoreError::Unauthorized(format!(
                "not authorized on {} to execute command",
                self.database
            ))),
            Some(FailureMode::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn duplicate_key(
        &self,
        collection: &str,
        index: &IndexDefinition,
        key: &[Bson],
    ) -> StoreError {
        let key = key
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        StoreError::DuplicateKey {
            collection: collection.to_string(),
            field: index.fields().join(","),
            message: format!(
                "E11000 duplicate key error collection: {}.{collection} index: {} dup key: {{ {key} }}",
                self.database, index.name
            ),
        }
    }
}

/// Whether a unique index covers `document`.
fn covers(index: &IndexDefinition, document: &Document) -> bool {
    index
        .partial_filter
        .as_ref()
        .map_or(true, |filter| matches_filter(filter, document))
}

/// Index key of `document`; fields resolve by dotted path and missing ones index as `null`.
fn index_key(index: &IndexDefinition, document: &Document) -> Vec<Bson> {
    index
        .fields()
        .into_iter()
        .map(|field| get_path(document, field).cloned().unwrap_or(Bson::Null))
        .collect()
}

/// First key shared by two covered documents, if any.
fn first_duplicate(index: &IndexDefinition, documents: &[Document]) -> Option<Vec<Bson>> {
    let mut seen: Vec<Vec<Bson>> = Vec::new();
    for document in documents.iter().filter(|d| covers(index, d)) {
        let key = index_key(index, document);
        if seen.contains(&key) {
            return Some(key);
        }
        seen.push(key);
    }
    None
}

#[async_trait]
impl Catalog for MemoryCatalog {
    fn database(&self) -> &str {
        &self.database
    }

    async fn ping(&self) -> Result<()> {
        self.check(false).await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.check(false).await?;
        Ok(self.collections.lock().await.keys().cloned().collect())
    }

    async fn create_collection(&self, name: &CollectionName) -> Result<CollectionStatus> {
        self.check(true).await?;
        let mut collections = self.collections.lock().await;
        if collections.contains_key(name.as_str()) {
            return Ok(CollectionStatus::AlreadyExists);
        }
        collections.insert(name.to_string(), CollectionState::default());
        debug!(collection = %name, "Collection created in memory");
        Ok(CollectionStatus::Created)
    }

    async fn list_indexes(&self, collection: &CollectionName) -> Result<Vec<IndexDefinition>> {
        self.check(false).await?;
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection.as_str())
            .map(|state| state.indexes.clone())
            .unwrap_or_default())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.check(true).await?;
        let definition = spec.definition();
        let mut collections = self.collections.lock().await;
        let state = collections.entry(spec.collection.to_string()).or_default();

        match definition.state_in(&state.indexes) {
            IndexState::Identical => Ok(()),
            IndexState::Conflicting(existing) => Err(StoreError::Conflict {
                collection: spec.collection.to_string(),
                index: existing.name.clone(),
                message: format!(
                    "an existing index has the same name or key with different options: \
                     existing [{existing}], requested [{definition}]"
                ),
            }),
            IndexState::Missing => {
                if definition.unique {
                    if let Some(key) = first_duplicate(&definition, &state.documents) {
                        return Err(self.duplicate_key(
                            spec.collection.as_str(),
                            &definition,
                            &key,
                        ));
                    }
                }
                debug!(index = %definition.name, collection = %spec.collection, "Index created in memory");
                state.indexes.push(definition);
                Ok(())
            }
        }
    }

    async fn insert_document(
        &self,
        collection: &CollectionName,
        document: Document,
    ) -> Result<()> {
        self.check(true).await?;
        let mut collections = self.collections.lock().await;
        let state = collections.entry(collection.to_string()).or_default();

        for index in state.indexes.iter().filter(|i| i.unique) {
            if !covers(index, &document) {
                continue;
            }
            let key = index_key(index, &document);
            let taken = state
                .documents
                .iter()
                .any(|existing| covers(index, existing) && index_key(index, existing) == key);
            if taken {
                return Err(self.duplicate_key(collection.as_str(), index, &key));
            }
        }

        state.documents.push(document);
        Ok(())
    }

    async fn soft_delete_many(
        &self,
        collection: &CollectionName,
        field: &FieldName,
        value: Bson,
    ) -> Result<u64> {
        self.check(true).await?;
        let mut collections = self.collections.lock().await;
        let Some(state) = collections.get_mut(collection.as_str()) else {
            return Ok(0);
        };

        let now = DateTime::now();
        let mut marked = 0;
        for document in &mut state.documents {
            if get_path(document, field.as_str()) == Some(&value)
                && SoftDeleteFilter::Null.is_active(document)
            {
                document.insert(DELETED_AT, now);
                marked += 1;
            }
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn name(s: &str) -> CollectionName {
        CollectionName::new(s).unwrap()
    }

    fn field(s: &str) -> FieldName {
        FieldName::new(s).unwrap()
    }

    #[tokio::test]
    async fn create_collection_is_idempotent() {
        let catalog = MemoryCatalog::new("autosrt");
        assert_eq!(
            catalog.create_collection(&name("users")).await.unwrap(),
            CollectionStatus::Created
        );
        assert_eq!(
            catalog.create_collection(&name("users")).await.unwrap(),
            CollectionStatus::AlreadyExists
        );
        assert_eq!(catalog.list_collections().await.unwrap(), ["users"]);
    }

    #[tokio::test]
    async fn identical_index_is_noop_and_conflict_is_reported() {
        let catalog = MemoryCatalog::new("autosrt");
        let spec = IndexSpec::unique(name("users"), field("email"))
            .with_partial_filter(SoftDeleteFilter::Null);

        catalog.create_index(&spec).await.unwrap();
        catalog.create_index(&spec).await.unwrap();
        assert_eq!(catalog.list_indexes(&name("users")).await.unwrap().len(), 1);

        let other = spec.clone().with_partial_filter(SoftDeleteFilter::Absent);
        let err = catalog.create_index(&other).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref index, .. } if index == "email_1"));

        let indexes = catalog.list_indexes(&name("users")).await.unwrap();
        assert_eq!(indexes, vec![spec.definition()]);
    }

    #[tokio::test]
    async fn index_over_duplicate_data_is_rejected() {
        let catalog = MemoryCatalog::new("autosrt");
        let users = name("users");
        catalog
            .insert_document(&users, doc! { "email": "a@x.com" })
            .await
            .unwrap();
        catalog
            .insert_document(&users, doc! { "email": "a@x.com" })
            .await
            .unwrap();

        let err = catalog
            .create_index(&IndexSpec::unique(users.clone(), field("email")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateKey { ref collection, ref field, .. }
                if collection == "users" && field == "email"
        ));
        assert!(catalog.list_indexes(&users).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_index_ignores_deleted_duplicates() {
        let catalog = MemoryCatalog::new("autosrt");
        let users = name("users");
        catalog
            .insert_document(&users, doc! { "email": "a@x.com", "deleted_at": DateTime::now() })
            .await
            .unwrap();
        catalog
            .insert_document(&users, doc! { "email": "a@x.com" })
            .await
            .unwrap();

        let spec = IndexSpec::unique(users.clone(), field("email"))
            .with_partial_filter(SoftDeleteFilter::Null);
        catalog.create_index(&spec).await.unwrap();
    }

    #[tokio::test]
    async fn missing_field_indexes_as_null() {
        let catalog = MemoryCatalog::new("autosrt");
        let usage = name("usage");
        catalog
            .create_index(&IndexSpec::unique(usage.clone(), field("user_id")))
            .await
            .unwrap();

        catalog.insert_document(&usage, doc! {}).await.unwrap();
        let err = catalog.insert_document(&usage, doc! {}).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn dotted_field_indexes_the_nested_value() {
        let catalog = MemoryCatalog::new("autosrt");
        let users = name("users");
        catalog
            .create_index(&IndexSpec::unique(users.clone(), field("profile.email")))
            .await
            .unwrap();

        catalog
            .insert_document(&users, doc! { "profile": { "email": "a@x.com" } })
            .await
            .unwrap();
        catalog
            .insert_document(&users, doc! { "profile": { "email": "b@x.com" } })
            .await
            .unwrap();

        let err = catalog
            .insert_document(&users, doc! { "profile": { "email": "a@x.com" } })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateKey { ref field, ref message, .. }
                if field == "profile.email" && message.contains("a@x.com")
        ));
    }

    #[tokio::test]
    async fn soft_delete_frees_the_key() {
        let catalog = MemoryCatalog::new("autosrt");
        let customer = name("customer");
        let spec = IndexSpec::unique(customer.clone(), field("customer_id"))
            .with_partial_filter(SoftDeleteFilter::Null);
        catalog.create_index(&spec).await.unwrap();

        catalog
            .insert_document(&customer, doc! { "customer_id": "ctm_1" })
            .await
            .unwrap();
        let marked = catalog
            .soft_delete_many(&customer, &field("customer_id"), Bson::from("ctm_1"))
            .await
            .unwrap();
        assert_eq!(marked, 1);

        catalog
            .insert_document(&customer, doc! { "customer_id": "ctm_1" })
            .await
            .unwrap();
        let documents = catalog.documents(&customer).await;
        assert_eq!(documents.len(), 2);
        assert!(documents[0].get_datetime(DELETED_AT).is_ok());
    }

    #[tokio::test]
    async fn failure_modes() {
        let unreachable = MemoryCatalog::new("autosrt").with_failure(FailureMode::Unreachable);
        assert!(unreachable.ping().await.unwrap_err().is_connection());

        let read_only = MemoryCatalog::new("autosrt").with_failure(FailureMode::ReadOnly);
        read_only.ping().await.unwrap();
        assert!(matches!(
            read_only.create_collection(&name("users")).await,
            Err(StoreError::Unauthorized(_))
        ));
    }
}
