//! Common test utilities for bootstrap integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use autosrt_schema_bootstrap::Bootstrapper;
use autosrt_schema_core::bson::Document;
use autosrt_schema_core::{CollectionName, SchemaSpec, SoftDeleteFilter};
use autosrt_schema_store::{Catalog, MemoryCatalog, StoreError};

/// Test harness with an in-memory store and a bootstrapper over it.
pub struct TestHarness {
    /// The store, kept for direct inspection.
    pub catalog: Arc<MemoryCatalog>,
    /// The bootstrapper under test.
    pub bootstrapper: Bootstrapper,
    /// The schema applied by [`TestHarness::bootstrap`].
    pub schema: SchemaSpec,
}

impl TestHarness {
    /// Create a harness over an empty store using the `null` soft-delete filter.
    pub fn new() -> Self {
        Self::with_filter(SoftDeleteFilter::Null)
    }

    /// Create a harness over an empty store using `filter` for every index.
    pub fn with_filter(filter: SoftDeleteFilter) -> Self {
        Self::with_schema(SchemaSpec::autosrt(filter).expect("built-in schema is valid"))
    }

    /// Create a harness over an empty store for an arbitrary schema.
    pub fn with_schema(schema: SchemaSpec) -> Self {
        let catalog = Arc::new(MemoryCatalog::new(schema.database.clone()));
        let bootstrapper = Bootstrapper::new(catalog.clone());
        Self {
            catalog,
            bootstrapper,
            schema,
        }
    }

    /// Apply the schema, panicking on failure.
    pub async fn bootstrap(&self) {
        self.bootstrapper
            .apply(&self.schema)
            .await
            .expect("bootstrap should succeed");
    }

    /// Insert a document into `collection`.
    pub async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.catalog
            .insert_document(&collection_name(collection), document)
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a collection name.
pub fn collection_name(name: &str) -> CollectionName {
    CollectionName::new(name).expect("valid collection name")
}
