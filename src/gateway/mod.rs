// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Capabilities consumed from the cloud backend.
//!
//! The backend is reached through three traits so that the flows can run
//! against Firebase or against the offline [`InMemoryGateway`]:
//! - [`DocumentStore`] (Firestore)
//! - [`BlobStore`] (Cloud Storage)
//! - [`AuthProvider`] (Firebase Authentication)

pub mod memory;

pub use memory::{FailPoint, InMemoryGateway};

use crate::error::Result;
use crate::models::Session;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

/// A document body: field name to JSON value.
pub type Document = serde_json::Map<String, Value>;

/// One document of a collection snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Document,
}

/// Stream of full collection snapshots. Dropping the receiver unsubscribes.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Result<Vec<DocumentSnapshot>>>;
pub type SnapshotSender = mpsc::UnboundedSender<Result<Vec<DocumentSnapshot>>>;

/// Document database operations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document; the store chooses and returns its id.
    async fn create(&self, collection: &str, doc: Document) -> Result<String>;

    /// Replace the whole document at `id`.
    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()>;

    /// Update a single field of an existing document.
    async fn update_field(&self, collection: &str, id: &str, field: &str, value: Value)
        -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Start a live query over `collection`.
    ///
    /// The current snapshot is delivered first, then a new full snapshot on
    /// every change. Failures are delivered in-band as `Err` items.
    fn subscribe(&self, collection: &str) -> SnapshotReceiver;
}

/// Object storage operations.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Canonical retrieval URL of the blob at `path`.
    async fn resolve_url(&self, path: &str) -> Result<String>;

    /// Inverse of [`BlobStore::resolve_url`].
    fn url_to_path(&self, url: &str) -> Result<String>;
}

/// Account and session operations.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;

    /// Send a verify-before-change message to `new_email` for the session's account.
    async fn send_verification_for_email_change(
        &self,
        session: &Session,
        new_email: &str,
    ) -> Result<()>;

    fn sign_out(&self);

    /// Sign-in methods registered for `email`; empty when no account uses it.
    async fn lookup_accounts_by_email(&self, email: &str) -> Result<Vec<String>>;
}
