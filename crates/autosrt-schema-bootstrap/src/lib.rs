//! Schema bootstrap for the autosrt database.
//!
//! This crate ensures the collections and unique indexes the autosrt services
//! rely on exist in the document store:
//!
//! - `users`: unique `email` and `phone_number`
//! - `usage`: unique `user_id`
//! - `customer`: unique `customer_id`
//! - `subscription`: unique `subscription_id`
//!
//! Each unique index excludes soft-deleted documents through a partial filter
//! on `deleted_at`, so a deleted account does not block re-registration.
//!
//! # Idempotence
//!
//! Existing collections and identical indexes are left alone. An index that
//! exists with different options is reported as a conflict and never
//! overwritten.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use autosrt_schema_bootstrap::Bootstrapper;
//! use autosrt_schema_core::{SchemaSpec, SoftDeleteFilter};
//! use autosrt_schema_store::MemoryCatalog;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = SchemaSpec::autosrt(SoftDeleteFilter::Null)?;
//! let bootstrapper = Bootstrapper::new(Arc::new(MemoryCatalog::new("autosrt")));
//!
//! let report = bootstrapper.apply(&schema).await?;
//! assert_eq!(report.created(), 9);
//!
//! // Running again changes nothing.
//! let report = bootstrapper.apply(&schema).await?;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bootstrapper;
pub mod config;
pub mod error;
pub mod report;

pub use bootstrapper::{Bootstrapper, DEFAULT_DECLARATION_TIMEOUT};
pub use config::BootstrapConfig;
pub use error::{BootstrapError, Result};
pub use report::{Action, BootstrapReport, Declaration, DeclarationOutcome, CONFIRMATION};
