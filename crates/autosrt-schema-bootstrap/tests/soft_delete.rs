//! Uniqueness and soft-delete behaviour of the bootstrapped indexes.

mod common;

use autosrt_schema_core::bson::{doc, Bson, DateTime, Document};
use autosrt_schema_core::{
    CollectionSpec, FieldName, IndexSpec, SchemaSpec, SoftDeleteFilter, AUTOSRT_UNIQUE_FIELDS,
};
use autosrt_schema_store::{Catalog, StoreError};

use common::{collection_name, TestHarness};

fn assert_duplicate(result: Result<(), StoreError>, collection: &str, field: &str) {
    match result {
        Err(StoreError::DuplicateKey {
            collection: ref c,
            field: ref f,
            ..
        }) => {
            assert_eq!(c, collection);
            assert_eq!(f, field);
        }
        other => panic!("expected duplicate key on {collection}.{field}, got {other:?}"),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn second_user_with_same_email_is_rejected() {
    let harness = TestHarness::new();
    harness.bootstrap().await;

    harness
        .insert("users", doc! { "email": "a@x.com", "phone_number": "1" })
        .await
        .unwrap();
    let result = harness
        .insert("users", doc! { "email": "a@x.com", "phone_number": "2" })
        .await;

    assert_duplicate(result, "users", "email");
}

#[tokio::test]
async fn deleted_user_does_not_block_email_with_absent_filter() {
    let harness = TestHarness::with_filter(SoftDeleteFilter::Absent);
    harness.bootstrap().await;

    harness
        .insert(
            "users",
            doc! { "email": "a@x.com", "phone_number": "1", "deleted_at": DateTime::now() },
        )
        .await
        .unwrap();
    harness
        .insert("users", doc! { "email": "a@x.com", "phone_number": "2" })
        .await
        .unwrap();
}

#[tokio::test]
async fn soft_deleting_frees_email_for_re_registration() {
    let harness = TestHarness::new();
    harness.bootstrap().await;
    let users = collection_name("users");

    harness
        .insert("users", doc! { "email": "a@x.com", "phone_number": "1" })
        .await
        .unwrap();
    let marked = harness
        .catalog
        .soft_delete_many(&users, &FieldName::new("email").unwrap(), Bson::from("a@x.com"))
        .await
        .unwrap();
    assert_eq!(marked, 1);

    harness
        .insert("users", doc! { "email": "a@x.com", "phone_number": "1" })
        .await
        .unwrap();
    assert_eq!(harness.catalog.documents(&users).await.len(), 2);
}

// ============================================================================
// Properties over every declared index
// ============================================================================

/// A document with `field` set to `value` and every other unique field of
/// `collection` set to something distinct.
fn colliding_on(collection: &str, field: &str, value: &str, salt: u32) -> Document {
    let mut document = Document::new();
    for (c, f) in AUTOSRT_UNIQUE_FIELDS {
        if c != collection {
            continue;
        }
        if f == field {
            document.insert(f, value);
        } else {
            document.insert(f, format!("{f}-{salt}"));
        }
    }
    document
}

#[tokio::test]
async fn every_partial_index_rejects_active_duplicates_and_ignores_deleted_ones() {
    for filter in [SoftDeleteFilter::Null, SoftDeleteFilter::Absent] {
        for (collection, field) in AUTOSRT_UNIQUE_FIELDS {
            // Both documents active: rejected.
            let harness = TestHarness::with_filter(filter);
            harness.bootstrap().await;
            harness
                .insert(collection, colliding_on(collection, field, "dup", 1))
                .await
                .unwrap();
            assert_duplicate(
                harness
                    .insert(collection, colliding_on(collection, field, "dup", 2))
                    .await,
                collection,
                field,
            );

            // One document deleted: accepted.
            let harness = TestHarness::with_filter(filter);
            harness.bootstrap().await;
            let mut deleted = colliding_on(collection, field, "dup", 1);
            deleted.insert("deleted_at", DateTime::now());
            harness.insert(collection, deleted).await.unwrap();
            harness
                .insert(collection, colliding_on(collection, field, "dup", 2))
                .await
                .unwrap_or_else(|e| panic!("{filter} {collection}.{field}: {e}"));
        }
    }
}

#[tokio::test]
async fn filters_disagree_on_explicit_null() {
    // Under `null`, an explicit null is active and collides.
    let harness = TestHarness::with_filter(SoftDeleteFilter::Null);
    harness.bootstrap().await;
    harness
        .insert("customer", doc! { "customer_id": "c1", "deleted_at": Bson::Null })
        .await
        .unwrap();
    assert_duplicate(
        harness.insert("customer", doc! { "customer_id": "c1" }).await,
        "customer",
        "customer_id",
    );

    // Under `absent`, an explicit null falls outside the index.
    let harness = TestHarness::with_filter(SoftDeleteFilter::Absent);
    harness.bootstrap().await;
    harness
        .insert("customer", doc! { "customer_id": "c1", "deleted_at": Bson::Null })
        .await
        .unwrap();
    harness
        .insert("customer", doc! { "customer_id": "c1" })
        .await
        .unwrap();
}

#[tokio::test]
async fn unfiltered_index_rejects_duplicates_regardless_of_deletion() {
    let schema = SchemaSpec {
        database: "autosrt".into(),
        collections: vec![CollectionSpec::new(collection_name("usage"))],
        indexes: vec![IndexSpec::unique(
            collection_name("usage"),
            FieldName::new("user_id").unwrap(),
        )],
    };
    let harness = TestHarness::with_schema(schema);
    harness.bootstrap().await;

    harness
        .insert("usage", doc! { "user_id": "u1", "deleted_at": DateTime::now() })
        .await
        .unwrap();
    assert_duplicate(
        harness
            .insert("usage", doc! { "user_id": "u1", "deleted_at": DateTime::now() })
            .await,
        "usage",
        "user_id",
    );
    assert_duplicate(
        harness.insert("usage", doc! { "user_id": "u1" }).await,
        "usage",
        "user_id",
    );
}

#[tokio::test]
async fn nested_field_index_compares_nested_values() {
    let schema = SchemaSpec::from_json_str(
        r#"{
            "database": "autosrt",
            "collections": [{ "name": "users" }],
            "indexes": [{ "collection": "users", "field": "profile.email", "partial_filter": "null" }]
        }"#,
    )
    .unwrap();
    let harness = TestHarness::with_schema(schema);
    harness.bootstrap().await;

    harness
        .insert("users", doc! { "profile": { "email": "a@x.com" } })
        .await
        .unwrap();
    harness
        .insert("users", doc! { "profile": { "email": "b@x.com" } })
        .await
        .unwrap();
    assert_duplicate(
        harness
            .insert("users", doc! { "profile": { "email": "b@x.com" } })
            .await,
        "users",
        "profile.email",
    );

    // Soft-deleting by the nested path frees the value again.
    let marked = harness
        .catalog
        .soft_delete_many(
            &collection_name("users"),
            &FieldName::new("profile.email").unwrap(),
            Bson::from("b@x.com"),
        )
        .await
        .unwrap();
    assert_eq!(marked, 1);
    harness
        .insert("users", doc! { "profile": { "email": "b@x.com" } })
        .await
        .unwrap();
}

#[tokio::test]
async fn distinct_values_are_accepted() {
    let harness = TestHarness::new();
    harness.bootstrap().await;

    for (i, email) in ["a@x.com", "b@x.com", "c@x.com"].iter().enumerate() {
        harness
            .insert("users", doc! { "email": *email, "phone_number": i.to_string() })
            .await
            .unwrap();
    }
    assert_eq!(
        harness.catalog.documents(&collection_name("users")).await.len(),
        3
    );
}
