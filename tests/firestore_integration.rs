// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). They are skipped otherwise.

use inzure::error::AppError;
use inzure::gateway::DocumentStore;
use inzure::models::UserProfile;
use inzure::services::UserRecordStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{snapshot_channel, test_db, test_user};

/// Unique collection per test run so runs do not see each other's data.
fn unique_collection(prefix: &str) -> String {
    format!("{}_{}", prefix, unique_suffix())
}

fn unique_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

#[tokio::test]
async fn test_user_crud_round_trip() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    let store = UserRecordStore::new(db, &unique_collection("Users"), false);

    let mut user = test_user("Ana");
    user.attributes.insert("phone".to_string(), json!("555-0100"));

    let id = store.add(&user).await.unwrap();
    let fetched = store.get(&id).await.unwrap();
    assert_eq!(fetched, user.clone().with_id(id.clone()));

    let replacement = UserProfile::new("Ana", "Maria", "ana@example.com").with_id(id.clone());
    store.update(&replacement).await.unwrap();
    let fetched = store.get(&id).await.unwrap();
    assert_eq!(fetched, replacement);
    assert!(!fetched.attributes.contains_key("phone"));

    store.delete(&fetched).await.unwrap();
    assert!(matches!(
        store.get(&id).await,
        Err(AppError::RecordNotFound(_))
    ));

    println!("✓ User CRUD verified: id={}", id);
}

#[tokio::test]
async fn test_update_field_requires_existing_document() {
    require_emulator!();

    let db = test_db().await;
    let collection = unique_collection("Users");

    let err = db
        .update_field(&collection, "missing", "image", json!("https://x"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RemoteWrite(_)));

    let doc = UserProfile::new("Ben", "B", "ben@example.com")
        .to_document()
        .unwrap();
    let id = db.create(&collection, doc).await.unwrap();
    db.update_field(&collection, &id, "image", json!("https://x"))
        .await
        .unwrap();

    let stored = db.get(&collection, &id).await.unwrap().unwrap();
    assert_eq!(stored.get("image"), Some(&json!("https://x")));
    assert_eq!(stored.get("firstName"), Some(&json!("Ben")));
}

#[tokio::test]
async fn test_subscription_sees_new_documents() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    let store = UserRecordStore::new(db, &unique_collection("Users"), false);

    let (callback, mut rx) = snapshot_channel();
    let subscription = store.subscribe(callback);

    let id = store.add(&test_user("Cleo")).await.unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(users) = rx.recv().await {
            if users.iter().any(|u| u.id == id) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    assert!(seen, "Subscription should deliver the new user");
    subscription.cancel();
}
