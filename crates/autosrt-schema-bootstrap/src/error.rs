//! Bootstrap error types.

use std::time::Duration;

use autosrt_schema_core::SchemaError;
use autosrt_schema_store::StoreError;

/// Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Errors that abort a bootstrap run.
///
/// Every variant stops the remaining declarations. Declarations already
/// applied stay in place; fixing the cause and re-running is safe.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The store is unreachable or rejected the credentials.
    #[error("connection error: {0}")]
    Connection(String),

    /// Existing documents violate a unique index being declared.
    #[error(
        "existing documents in {collection} violate the unique index on {field}; \
         deduplicate existing documents before re-running ({message})"
    )]
    ConstraintViolation {
        /// Collection holding the duplicates.
        collection: String,
        /// Field with duplicate values.
        field: String,
        /// Message reported by the store.
        message: String,
    },

    /// An index with the same name or key exists with different options.
    #[error("conflicting definition for index {collection}.{index}: {message}")]
    ConflictingDefinition {
        /// Collection holding the index.
        collection: String,
        /// Name of the existing index.
        index: String,
        /// Description of the difference, as reported.
        message: String,
    },

    /// The credentials lack the privileges to change the schema.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A declaration did not complete within the per-declaration timeout.
    #[error("{declaration} did not complete within {after:?}")]
    Timeout {
        /// The declaration that timed out.
        declaration: String,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// A configuration value could not be understood.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The schema declaration itself is invalid.
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl BootstrapError {
    /// Process exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidSchema(_) | Self::InvalidConfig(_) => 2,
            Self::Connection(_) | Self::Timeout { .. } => 3,
            Self::PermissionDenied(_) => 4,
            Self::ConstraintViolation { .. } | Self::ConflictingDefinition { .. } => 5,
            Self::Store(_) => 1,
        }
    }
}

impl From<StoreError> for BootstrapError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(msg) | StoreError::Timeout(msg) => Self::Connection(msg),
            StoreError::Unauthorized(msg) => Self::PermissionDenied(msg),
            StoreError::DuplicateKey {
                collection,
                field,
                message,
            } => Self::ConstraintViolation {
                collection,
                field,
                message,
            },
            StoreError::Conflict {
                collection,
                index,
                message,
            } => Self::ConflictingDefinition {
                collection,
                index,
                message,
            },
            StoreError::Database(msg) => Self::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_maps_to_constraint_violation_with_hint() {
        let err = BootstrapError::from(StoreError::DuplicateKey {
            collection: "users".into(),
            field: "email".into(),
            message: "E11000".into(),
        });
        let text = err.to_string();
        assert!(text.contains("users"));
        assert!(text.contains("email"));
        assert!(text.contains("deduplicate"));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn store_taxonomy_maps_onto_bootstrap_taxonomy() {
        assert!(matches!(
            BootstrapError::from(StoreError::Connection("down".into())),
            BootstrapError::Connection(_)
        ));
        assert!(matches!(
            BootstrapError::from(StoreError::Unauthorized("no".into())),
            BootstrapError::PermissionDenied(_)
        ));
        assert!(matches!(
            BootstrapError::from(StoreError::Conflict {
                collection: "users".into(),
                index: "email_1".into(),
                message: "differs".into(),
            }),
            BootstrapError::ConflictingDefinition { .. }
        ));
        assert!(matches!(
            BootstrapError::from(StoreError::Database("boom".into())),
            BootstrapError::Store(_)
        ));
    }
}
