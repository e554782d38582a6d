//! MongoDB catalog implementation.
//!
//! This module provides the `MongoCatalog` implementation of the `Catalog` trait.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use tracing::{debug, info, instrument};

use bson::{doc, Bson, DateTime, Document};
use autosrt_schema_core::{CollectionName, FieldName, IndexDefinition, IndexSpec, DELETED_AT};

use crate::error::{Result, StoreError};
use crate::{Catalog, CollectionStatus};

/// Server error codes the catalog interprets.
mod code {
    pub const UNAUTHORIZED: i32 = 13;
    pub const NAMESPACE_NOT_FOUND: i32 = 26;
    pub const NAMESPACE_EXISTS: i32 = 48;
    pub const INDEX_OPTIONS_CONFLICT: i32 = 85;
    pub const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
    pub const DUPLICATE_KEY: i32 = 11000;
}

/// Default server selection and connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

/// MongoDB-backed catalog bound to one database.
#[derive(Debug, Clone)]
pub struct MongoCatalog {
    db: Database,
}

impl MongoCatalog {
    /// Connect to `uri` and bind to `database`, verifying the connection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the URI is invalid or the server
    /// cannot be reached.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        Self::connect_with_timeout(uri, database, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Like [`MongoCatalog::connect`] with an explicit server selection timeout.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the URI is invalid or the server
    /// cannot be reached within `timeout`.
    pub async fn connect_with_timeout(
        uri: &str,
        database: &str,
        timeout: Duration,
    ) -> Result<Self> {
        info!(database, "Connecting to MongoDB");

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Connection(format!("invalid MongoDB URI: {e}")))?;
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.app_name = Some("autosrt-bootstrap".to_string());

        let client = Client::with_options(options)
            .map_err(|e| StoreError::Connection(format!("failed to create client: {e}")))?;

        let catalog = Self::from_database(client.database(database));
        catalog.ping().await?;

        info!(database, "Connected to MongoDB");
        Ok(catalog)
    }

    /// Wrap an already configured database handle.
    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &CollectionName) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(name.as_str())
    }
}

/// Server error code carried by a command or write error.
fn error_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        _ => None,
    }
}

/// Map a driver error onto the catalog taxonomy.
fn classify(err: &MongoError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::Authentication { .. } => StoreError::Connection(err.to_string()),
        _ if error_code(err) == Some(code::UNAUTHORIZED) => {
            StoreError::Unauthorized(err.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}

/// Field named in a duplicate key message such as
/// `E11000 ... index: email_1 dup key: { email: "a@x.com" }`.
fn duplicate_field(message: &str) -> Option<String> {
    if let Some((_, rest)) = message.split_once("dup key: {") {
        let field = rest.trim_start().split(':').next()?.trim();
        if !field.is_empty() {
            return Some(field.to_string());
        }
    }
    let (_, rest) = message.split_once("index: ")?;
    let index = rest.split_whitespace().next()?;
    Some(index.strip_suffix("_1").unwrap_or(index).to_string())
}

fn definition_from_model(model: IndexModel) -> IndexDefinition {
    let options = model.options;
    IndexDefinition {
        name: options
            .as_ref()
            .and_then(|o| o.name.clone())
            .unwrap_or_default(),
        keys: model.keys,
        unique: options.as_ref().and_then(|o| o.unique).unwrap_or(false),
        partial_filter: options.and_then(|o| o.partial_filter_expression),
    }
}

#[async_trait]
impl Catalog for MongoCatalog {
    fn database(&self) -> &str {
        self.db.name()
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| match classify(&e) {
                StoreError::Database(message) => StoreError::Connection(message),
                other => other,
            })
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.db
            .list_collection_names()
            .await
            .map_err(|e| classify(&e))
    }

    #[instrument(skip(self), fields(database = %self.db.name()))]
    async fn create_collection(&self, name: &CollectionName) -> Result<CollectionStatus> {
        match self.db.create_collection(name.as_str()).await {
            Ok(()) => Ok(CollectionStatus::Created),
            Err(e) if error_code(&e) == Some(code::NAMESPACE_EXISTS) => {
                debug!(collection = %name, "Collection already exists");
                Ok(CollectionStatus::AlreadyExists)
            }
            Err(e) => Err(classify(&e)),
        }
    }

    async fn list_indexes(&self, collection: &CollectionName) -> Result<Vec<IndexDefinition>> {
        let cursor = match self.collection(collection).list_indexes().await {
            Ok(cursor) => cursor,
            Err(e) if error_code(&e) == Some(code::NAMESPACE_NOT_FOUND) => return Ok(Vec::new()),
            Err(e) => return Err(classify(&e)),
        };

        let models: Vec<IndexModel> = cursor.try_collect().await.map_err(|e| classify(&e))?;
        Ok(models.into_iter().map(definition_from_model).collect())
    }

    #[instrument(skip(self, spec), fields(collection = %spec.collection, field = %spec.field))]
    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let definition = spec.definition();

        let mut options = IndexOptions::builder()
            .name(definition.name.clone())
            .unique(definition.unique)
            .build();
        options.partial_filter_expression = definition.partial_filter.clone();

        let model = IndexModel::builder()
            .keys(definition.keys.clone())
            .options(Some(options))
            .build();

        match self.collection(&spec.collection).create_index(model).await {
            Ok(_) => Ok(()),
            Err(e) => Err(match error_code(&e) {
                Some(code::INDEX_OPTIONS_CONFLICT | code::INDEX_KEY_SPECS_CONFLICT) => {
                    StoreError::Conflict {
                        collection: spec.collection.to_string(),
                        index: definition.name,
                        message: e.to_string(),
                    }
                }
                Some(code::DUPLICATE_KEY) => StoreError::DuplicateKey {
                    collection: spec.collection.to_string(),
                    field: spec.field.to_string(),
                    message: e.to_string(),
                },
                _ => classify(&e),
            }),
        }
    }

    async fn insert_document(
        &self,
        collection: &CollectionName,
        document: Document,
    ) -> Result<()> {
        match self.collection(collection).insert_one(document).await {
            Ok(_) => Ok(()),
            Err(e) if error_code(&e) == Some(code::DUPLICATE_KEY) => {
                let message = e.to_string();
                Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    field: duplicate_field(&message).unwrap_or_default(),
                    message,
                })
            }
            Err(e) => Err(classify(&e)),
        }
    }

    async fn soft_delete_many(
        &self,
        collection: &CollectionName,
        field: &FieldName,
        value: Bson,
    ) -> Result<u64> {
        let filter = doc! { field.as_str(): value, DELETED_AT: Bson::Null };
        let update = doc! { "$set": { DELETED_AT: DateTime::now() } };

        let result = self
            .collection(collection)
            .update_many(filter, update)
            .await
            .map_err(|e| classify(&e))?;
        Ok(result.modified_count)
    }
}
