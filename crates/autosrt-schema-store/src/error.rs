//! Error types for catalog access.

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in catalog operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The credentials lack the privileges for the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A unique index rejected a document.
    #[error("duplicate key in {collection}.{field}: {message}")]
    DuplicateKey {
        /// Collection holding the index.
        collection: String,
        /// Indexed field.
        field: String,
        /// Message reported by the store.
        message: String,
    },

    /// An index exists under the same name or key with different options.
    #[error("conflicting index {collection}.{index}: {message}")]
    Conflict {
        /// Collection holding the index.
        collection: String,
        /// Name of the conflicting index.
        index: String,
        /// Message reported by the store.
        message: String,
    },

    /// The operation did not complete in time.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Whether the error means the store itself is unusable.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}
