//! The schema bootstrapper.
//!
//! Applies a [`SchemaSpec`] to a [`Catalog`]: collections first, then unique
//! indexes, each in declaration order. Every declaration is independent and
//! idempotent; the first failure aborts the run without touching what was
//! already applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use autosrt_schema_core::{IndexSpec, IndexState, SchemaSpec};
use autosrt_schema_store::{Catalog, CollectionStatus};

use crate::error::{BootstrapError, Result};
use crate::report::{Action, BootstrapReport, Declaration};

/// Default upper bound for a single declaration.
pub const DEFAULT_DECLARATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Ensures collections and unique indexes exist.
///
/// The bootstrapper holds no schema state of its own; the catalog is the
/// only source of truth, so it can be run any number of times.
#[derive(Clone)]
pub struct Bootstrapper {
    catalog: Arc<dyn Catalog>,
    declaration_timeout: Duration,
}

impl Bootstrapper {
    /// Create a bootstrapper over `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            declaration_timeout: DEFAULT_DECLARATION_TIMEOUT,
        }
    }

    /// Set the upper bound for each declaration.
    #[must_use]
    pub fn with_declaration_timeout(mut self, timeout: Duration) -> Self {
        self.declaration_timeout = timeout;
        self
    }

    /// The catalog this bootstrapper writes to.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Apply every declaration of `schema`.
    ///
    /// # Errors
    ///
    /// - `BootstrapError::InvalidSchema` if the declaration is inconsistent.
    /// - `BootstrapError::Connection` if the store is unreachable.
    /// - `BootstrapError::ConstraintViolation` if existing data violates an index.
    /// - `BootstrapError::ConflictingDefinition` if an index exists with other options.
    /// - `BootstrapError::PermissionDenied` if the store refuses the change.
    /// - `BootstrapError::Timeout` if a declaration exceeds the timeout.
    #[instrument(skip(self, schema), fields(database = %self.catalog.database()))]
    pub async fn apply(&self, schema: &SchemaSpec) -> Result<BootstrapReport> {
        schema.validate()?;
        info!(
            collections = schema.collections.len(),
            indexes = schema.indexes.len(),
            "Starting schema bootstrap"
        );

        self.bounded("connection check", self.ping()).await?;

        let mut report = BootstrapReport::new(self.catalog.database(), false);

        for collection in &schema.collections {
            let declaration = Declaration::Collection {
                name: collection.name.clone(),
            };
            let status = self
                .bounded(&declaration, async {
                    self.catalog
                        .create_collection(&collection.name)
                        .await
                        .map_err(BootstrapError::from)
                })
                .await
                .map_err(|e| {
                    error!(collection = %collection.name, error = %e, "Failed to create collection");
                    e
                })?;

            let action = match status {
                CollectionStatus::Created => {
                    info!(collection = %collection.name, "Collection created");
                    Action::Created
                }
                CollectionStatus::AlreadyExists => {
                    info!(collection = %collection.name, "Collection already exists, skipping");
                    Action::Unchanged
                }
            };
            report.record(declaration, action);
        }

        for index in &schema.indexes {
            let declaration = Declaration::Index {
                spec: index.clone(),
            };
            let action = self
                .bounded(&declaration, self.ensure_index(index))
                .await
                .map_err(|e| {
                    error!(
                        collection = %index.collection,
                        field = %index.field,
                        error = %e,
                        "Failed to create index"
                    );
                    e
                })?;
            report.record(declaration, action);
        }

        let report = report.finish();
        info!(
            created = report.created(),
            unchanged = report.unchanged(),
            "Collections and indexes created successfully"
        );
        Ok(report)
    }

    /// Compare `schema` against the store without changing anything.
    ///
    /// Conflicting index definitions are reported in the plan instead of
    /// aborting it.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError::InvalidSchema`, `Connection`, `PermissionDenied`
    /// or `Timeout` when the store cannot be inspected.
    #[instrument(skip(self, schema), fields(database = %self.catalog.database()))]
    pub async fn plan(&self, schema: &SchemaSpec) -> Result<BootstrapReport> {
        schema.validate()?;
        self.bounded("connection check", self.ping()).await?;

        let mut report = BootstrapReport::new(self.catalog.database(), true);

        let existing = self
            .bounded("list collections", async {
                self.catalog
                    .list_collections()
                    .await
                    .map_err(BootstrapError::from)
            })
            .await?;
        for collection in &schema.collections {
            let action = if existing.iter().any(|name| name == collection.name.as_str()) {
                Action::Unchanged
            } else {
                Action::WouldCreate
            };
            report.record(
                Declaration::Collection {
                    name: collection.name.clone(),
                },
                action,
            );
        }

        for index in &schema.indexes {
            let declaration = Declaration::Index {
                spec: index.clone(),
            };
            let state = self.bounded(&declaration, self.index_state(index)).await?;
            let action = match state {
                IndexState::Missing => Action::WouldCreate,
                IndexState::Identical => Action::Unchanged,
                IndexState::Conflicting(existing) => {
                    warn!(collection = %index.collection, index = %existing.name, "Conflicting index definition");
                    Action::Conflict(format!(
                        "existing [{existing}] differs from declared [{}]",
                        index.definition()
                    ))
                }
            };
            report.record(declaration, action);
        }

        let report = report.finish();
        debug!(pending = report.pending(), "Plan complete");
        Ok(report)
    }

    async fn ping(&self) -> Result<()> {
        self.catalog
            .ping()
            .await
            .map_err(|e| BootstrapError::Connection(e.to_string()))
    }

    async fn index_state(&self, index: &IndexSpec) -> Result<IndexState> {
        let existing = self.catalog.list_indexes(&index.collection).await?;
        Ok(index.definition().state_in(&existing))
    }

    /// Create `index` unless an identical one exists.
    ///
    /// A conflicting definition is reported without calling the store, so the
    /// existing index is never modified.
    async fn ensure_index(&self, index: &IndexSpec) -> Result<Action> {
        match self.index_state(index).await? {
            IndexState::Identical => {
                info!(collection = %index.collection, field = %index.field, "Index already exists, skipping");
                Ok(Action::Unchanged)
            }
            IndexState::Conflicting(existing) => Err(BootstrapError::ConflictingDefinition {
                collection: index.collection.to_string(),
                index: existing.name.clone(),
                message: format!(
                    "existing [{existing}] differs from declared [{}]",
                    index.definition()
                ),
            }),
            IndexState::Missing => {
                self.catalog.create_index(index).await?;
                info!(collection = %index.collection, field = %index.field, "Index created");
                Ok(Action::Created)
            }
        }
    }

    /// Run `operation` under the per-declaration timeout.
    async fn bounded<T>(
        &self,
        declaration: impl ToString,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.declaration_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(BootstrapError::Timeout {
                declaration: declaration.to_string(),
                after: self.declaration_timeout,
            }),
        }
    }
}

impl std::fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("database", &self.catalog.database())
            .field("declaration_timeout", &self.declaration_timeout)
            .finish()
    }
}
