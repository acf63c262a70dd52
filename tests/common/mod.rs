// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use inzure::config::Config;
use inzure::db::FirestoreDb;
use inzure::gateway::InMemoryGateway;
use inzure::models::{SessionStore, UserProfile};
use inzure::AppContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create an offline app context over a fresh in-memory gateway.
#[allow(dead_code)]
pub fn test_context() -> (AppContext, Arc<InMemoryGateway>) {
    test_context_with(Config::test_default())
}

#[allow(dead_code)]
pub fn test_context_with(config: Config) -> (AppContext, Arc<InMemoryGateway>) {
    let session = SessionStore::new();
    let gateway = Arc::new(InMemoryGateway::new(&config.storage_bucket, session.clone()));
    let ctx = AppContext::new(
        config,
        session,
        gateway.clone(),
        gateway.clone(),
        gateway.clone(),
    );
    (ctx, gateway)
}

/// Helper to create a basic test user
#[allow(dead_code)]
pub fn test_user(first: &str) -> UserProfile {
    UserProfile::new(first, "Tester", format!("{}@example.com", first.to_lowercase()))
}

/// Callback that forwards every snapshot into a channel.
#[allow(dead_code)]
pub fn snapshot_channel() -> (
    impl Fn(Vec<UserProfile>) + Send + Sync + 'static,
    mpsc::UnboundedReceiver<Vec<UserProfile>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        move |users: Vec<UserProfile>| {
            let _ = tx.send(users);
        },
        rx,
    )
}

/// Wait for the next snapshot, failing the test after a second.
#[allow(dead_code)]
pub async fn next_snapshot(rx: &mut mpsc::UnboundedReceiver<Vec<UserProfile>>) -> Vec<UserProfile> {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timed out waiting for snapshot")
        .expect("Snapshot channel closed")
}

/// Let spawned tasks run.
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
