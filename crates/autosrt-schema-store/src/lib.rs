//! Catalog access for the autosrt schema bootstrapper.
//!
//! This crate provides the store handle the bootstrapper is given. A
//! [`Catalog`] exposes just enough of a document store to declare schema:
//! creating collections, listing and creating indexes, and writing documents
//! so that uniqueness constraints can be exercised.
//!
//! # Backends
//!
//! - [`MongoCatalog`]: a MongoDB database (feature `mongodb-backend`, on by default)
//! - [`MemoryCatalog`]: an in-process catalog enforcing partial unique indexes
//!
//! # Example
//!
//! ```no_run
//! use autosrt_schema_store::{Catalog, MongoCatalog};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = MongoCatalog::connect("mongodb://localhost:27017", "autosrt").await?;
//! for name in catalog.list_collections().await? {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
#[cfg(feature = "mongodb-backend")]
pub mod mongo;

pub use error::{Result, StoreError};
pub use memory::{FailureMode, MemoryCatalog};
#[cfg(feature = "mongodb-backend")]
pub use mongo::MongoCatalog;

use async_trait::async_trait;
use bson::{Bson, Document};
use autosrt_schema_core::{CollectionName, FieldName, IndexDefinition, IndexSpec};

/// Result of a create-if-absent collection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// The collection was created by this request.
    Created,
    /// The collection was already present.
    AlreadyExists,
}

/// The schema-facing operations of a document store.
///
/// A catalog is bound to a single database. Implementations must make
/// `create_collection` and `create_index` safe to repeat.
#[async_trait]
pub trait Catalog: Send + Sync {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Name of the database this catalog is bound to.
    fn database(&self) -> &str;

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the store cannot be reached.
    async fn ping(&self) -> Result<()>;

    // =========================================================================
    // Collections
    // =========================================================================

    /// Names of the existing collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Create a collection unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the request for any reason
    /// other than the collection existing.
    async fn create_collection(&self, name: &CollectionName) -> Result<CollectionStatus>;

    // =========================================================================
    // Indexes
    // =========================================================================

    /// Indexes defined on a collection; empty if the collection is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn list_indexes(&self, collection: &CollectionName) -> Result<Vec<IndexDefinition>>;

    /// Create the index described by `spec`.
    ///
    /// Creating an index identical to an existing one is a no-op.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if an index with the same name or key has other options.
    /// - `StoreError::DuplicateKey` if existing documents violate the constraint.
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    // =========================================================================
    // Documents
    // =========================================================================

    /// Insert a document, enforcing the collection's unique indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if a unique index rejects the document.
    async fn insert_document(&self, collection: &CollectionName, document: Document)
        -> Result<()>;

    /// Soft-delete active documents whose `field` equals `value`.
    ///
    /// Sets `deleted_at` to the current time and returns how many documents
    /// were marked.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    async fn soft_delete_many(
        &self,
        collection: &CollectionName,
        field: &FieldName,
        value: Bson,
    ) -> Result<u64>;
}
