//! Error types for schema declarations.

use std::path::PathBuf;

use crate::names::NameError;

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while loading or validating a schema declaration.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A collection or field name is invalid.
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// The target database name is empty.
    #[error("database name must not be empty")]
    EmptyDatabase,

    /// The same collection is declared more than once.
    #[error("collection declared twice: {collection}")]
    DuplicateCollection {
        /// The repeated collection.
        collection: String,
    },

    /// An index refers to a collection that is not declared.
    #[error("index {index} refers to undeclared collection {collection}")]
    UnknownCollection {
        /// The undeclared collection.
        collection: String,
        /// Name of the index.
        index: String,
    },

    /// Two indexes on one collection share a name.
    #[error("index declared twice: {collection}.{index}")]
    DuplicateIndex {
        /// The collection holding both declarations.
        collection: String,
        /// The repeated index name.
        index: String,
    },

    /// The schema file could not be read.
    #[error("failed to read schema file {}: {source}", path.display())]
    Io {
        /// The file that failed to load.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The schema document could not be parsed.
    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),
}
