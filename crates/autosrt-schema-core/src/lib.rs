//! Core schema model for the autosrt database.
//!
//! This crate provides the declarative description of what the bootstrapper
//! ensures exists in the document store:
//!
//! - **Names**: `CollectionName`, `FieldName`
//! - **Soft deletes**: `SoftDeleteFilter`, the `deleted_at` predicate used by partial indexes
//! - **Indexes**: `IndexSpec`, `IndexDefinition`, `IndexState`
//! - **Schema**: `SchemaSpec`, `CollectionSpec`, and the built-in autosrt table
//!
//! # Soft-delete convention
//!
//! Two spellings of "not deleted" exist for partial indexes:
//! `{ deleted_at: null }` and `{ deleted_at: { $exists: false } }`. They are
//! not interchangeable: only the first treats an explicit `null` as active.
//! The built-in schema takes the convention as a parameter and defaults to
//! [`SoftDeleteFilter::Null`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod filter;
pub mod index;
pub mod names;
pub mod spec;

pub use error::{Result, SchemaError};
pub use filter::{get_path, matches_filter, SoftDeleteFilter, UnknownFilter, DELETED_AT};
pub use index::{IndexDefinition, IndexSpec, IndexState};
pub use names::{CollectionName, FieldName, NameError};
pub use spec::{
    CollectionSpec, SchemaSpec, AUTOSRT_COLLECTIONS, AUTOSRT_DATABASE, AUTOSRT_UNIQUE_FIELDS,
};

pub use bson;
