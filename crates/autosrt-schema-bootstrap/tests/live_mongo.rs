//! Live MongoDB integration tests.
//!
//! These tests run against a real MongoDB deployment.
//! Set the `MONGO_URI` environment variable to its connection string.
//! Each test uses a fresh database named after the current time.
//!
//! Run with: cargo test --test live_mongo -- --nocapture --ignored

#![cfg(feature = "mongodb-backend")]

use std::sync::Arc;

use autosrt_schema_bootstrap::{BootstrapError, Bootstrapper};
use autosrt_schema_core::bson::doc;
use autosrt_schema_core::{CollectionName, SchemaSpec, SoftDeleteFilter};
use autosrt_schema_store::{Catalog, MongoCatalog, StoreError};

fn get_mongo_uri() -> String {
    std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

fn generate_test_database() -> String {
    format!(
        "autosrt_test_{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn connect() -> (Arc<MongoCatalog>, SchemaSpec) {
    let database = generate_test_database();
    println!("Using database: {database}");
    let catalog = MongoCatalog::connect(&get_mongo_uri(), &database)
        .await
        .expect("Failed to connect to MongoDB");
    let schema = SchemaSpec::autosrt(SoftDeleteFilter::Null)
        .unwrap()
        .with_database(database);
    (Arc::new(catalog), schema)
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
#[ignore] // Run with --ignored flag
async fn live_bootstrap_is_idempotent() {
    let (catalog, schema) = connect().await;
    let bootstrapper = Bootstrapper::new(catalog.clone());

    let first = bootstrapper.apply(&schema).await.unwrap();
    print!("{first}");
    assert_eq!(first.created(), 9);

    let second = bootstrapper.apply(&schema).await.unwrap();
    print!("{second}");
    assert!(second.is_clean(), "second run changed something");

    let plan = bootstrapper.plan(&schema).await.unwrap();
    assert!(plan.is_clean());
}

#[tokio::test]
#[ignore]
async fn live_duplicate_email_is_rejected() {
    let (catalog, schema) = connect().await;
    Bootstrapper::new(catalog.clone())
        .apply(&schema)
        .await
        .unwrap();
    let users = CollectionName::new("users").unwrap();

    catalog
        .insert_document(&users, doc! { "email": "a@x.com", "phone_number": "1", "deleted_at": null })
        .await
        .unwrap();
    let err = catalog
        .insert_document(&users, doc! { "email": "a@x.com", "phone_number": "2", "deleted_at": null })
        .await
        .unwrap_err();

    println!("Error: {err}");
    assert!(
        matches!(err, StoreError::DuplicateKey { ref field, .. } if field == "email"),
        "expected duplicate email, got {err:?}"
    );
}

#[tokio::test]
#[ignore]
async fn live_unreachable_server_is_a_connection_error() {
    let err = MongoCatalog::connect_with_timeout(
        "mongodb://127.0.0.1:1",
        "autosrt_unreachable",
        std::time::Duration::from_millis(500),
    )
    .await
    .unwrap_err();

    println!("Error: {err}");
    assert!(err.is_connection());
    assert!(matches!(
        BootstrapError::from(err),
        BootstrapError::Connection(_)
    ));
}
