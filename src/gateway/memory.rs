// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Offline gateway holding documents, blobs and accounts in memory.
//!
//! Implements all three gateway traits with Firebase-like semantics
//! (`set` upserts, `update_field` requires an existing document, deleting an
//! absent id succeeds). Individual operations can be made to fail with
//! [`InMemoryGateway::fail_on`] to exercise error paths.

use super::{
    AuthProvider, BlobStore, Document, DocumentSnapshot, DocumentStore, SnapshotReceiver,
    SnapshotSender,
};
use crate::error::{AppError, Result};
use crate::models::{Session, SessionStore};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;

const URL_SCHEME: &str = "memory://";

/// Operations that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Create,
    Set,
    UpdateField,
    DeleteDocument,
    Get,
    Snapshot,
    PutBlob,
    DeleteBlob,
    ResolveUrl,
    SendVerification,
    LookupAccounts,
}

/// A stored blob.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory implementation of [`DocumentStore`], [`BlobStore`] and [`AuthProvider`].
pub struct InMemoryGateway {
    bucket: String,
    collections: DashMap<String, BTreeMap<String, Document>>,
    blobs: DashMap<String, StoredBlob>,
    /// Registered accounts: email -> sign-in methods
    accounts: DashMap<String, Vec<String>>,
    listeners: Mutex<Vec<(String, SnapshotSender)>>,
    failures: Mutex<HashSet<FailPoint>>,
    sent_verifications: Mutex<Vec<(String, String)>>,
    session: SessionStore,
}

impl InMemoryGateway {
    pub fn new(bucket: &str, session: SessionStore) -> Self {
        Self {
            bucket: bucket.to_string(),
            collections: DashMap::new(),
            blobs: DashMap::new(),
            accounts: DashMap::new(),
            listeners: Mutex::new(Vec::new()),
            failures: Mutex::new(HashSet::new()),
            sent_verifications: Mutex::new(Vec::new()),
            session,
        }
    }

    // ─── Test Controls ──────────────────────────────────────────

    /// Make every later call of `point` fail until cleared.
    pub fn fail_on(&self, point: FailPoint) {
        self.lock_failures().insert(point);
    }

    pub fn clear_failure(&self, point: FailPoint) {
        self.lock_failures().remove(&point);
    }

    /// Register an auth account using `email`.
    pub fn register_account(&self, email: &str) {
        self.accounts
            .entry(email.to_string())
            .or_default()
            .push("password".to_string());
    }

    /// Establish a session as if the account had signed in.
    pub fn sign_in_as(&self, user_id: &str, email: &str) {
        self.register_account(email);
        self.session.set(Session {
            user_id: user_id.to_string(),
            email: email.to_string(),
            id_token: format!("memory-token-{}", user_id),
        });
    }

    /// Verification messages sent so far, as `(user_id, new_email)`.
    pub fn sent_verifications(&self) -> Vec<(String, String)> {
        self.sent_verifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn blob(&self, path: &str) -> Option<StoredBlob> {
        self.blobs.get(path).map(|b| b.clone())
    }

    pub fn blob_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Store a blob directly, bypassing failure injection.
    pub fn seed_blob(&self, path: &str, bytes: Vec<u8>) {
        self.blobs.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Number of live subscriptions still attached.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.lock_listeners();
        listeners.retain(|(_, tx)| !tx.is_closed());
        listeners.len()
    }

    // ─── Helpers ───────────────────────────────────────────────

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, HashSet<FailPoint>> {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<(String, SnapshotSender)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn should_fail(&self, point: FailPoint) -> bool {
        self.lock_failures().contains(&point)
    }

    fn check(&self, point: FailPoint, err: impl FnOnce(String) -> AppError) -> Result<()> {
        if self.should_fail(point) {
            return Err(err(format!("injected failure: {:?}", point)));
        }
        Ok(())
    }

    fn snapshot(&self, collection: &str) -> Vec<DocumentSnapshot> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| DocumentSnapshot {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn current_update(&self, collection: &str) -> Result<Vec<DocumentSnapshot>> {
        if self.should_fail(FailPoint::Snapshot) {
            return Err(AppError::RemoteRead(
                "injected failure: Snapshot".to_string(),
            ));
        }
        Ok(self.snapshot(collection))
    }

    /// Push the current snapshot to every listener on `collection`.
    fn notify(&self, collection: &str) {
        let mut listeners = self.lock_listeners();
        listeners.retain(|(col, tx)| {
            if col != collection {
                return !tx.is_closed();
            }
            tx.send(self.current_update(collection)).is_ok()
        });
    }
}

#[async_trait]
impl DocumentStore for InMemoryGateway {
    async fn create(&self, collection: &str, doc: Document) -> Result<String> {
        self.check(FailPoint::Create, AppError::RemoteWrite)?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc);
        self.notify(collection);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        self.check(FailPoint::Set, AppError::RemoteWrite)?;

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        self.notify(collection);
        Ok(())
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<()> {
        self.check(FailPoint::UpdateField, AppError::RemoteWrite)?;

        {
            let mut docs = self.collections.get_mut(collection).ok_or_else(|| {
                AppError::RemoteWrite(format!("No document to update: {}/{}", collection, id))
            })?;
            let doc = docs.get_mut(id).ok_or_else(|| {
                AppError::RemoteWrite(format!("No document to update: {}/{}", collection, id))
            })?;
            doc.insert(field.to_string(), value);
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.check(FailPoint::DeleteDocument, AppError::RemoteWrite)?;

        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        self.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check(FailPoint::Get, AppError::RemoteRead)?;

        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    fn subscribe(&self, collection: &str) -> SnapshotReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        // Initial snapshot; the receiver is still held so this cannot fail.
        let _ = tx.send(self.current_update(collection));
        self.lock_listeners().push((collection.to_string(), tx));
        rx
    }
}

#[async_trait]
impl BlobStore for InMemoryGateway {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.check(FailPoint::PutBlob, AppError::Upload)?;

        self.blobs.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.check(FailPoint::DeleteBlob, AppError::RemoteWrite)?;

        self.blobs
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AppError::RemoteWrite(format!("Object does not exist: {}", path)))
    }

    async fn resolve_url(&self, path: &str) -> Result<String> {
        self.check(FailPoint::ResolveUrl, AppError::RemoteRead)?;

        if !self.blobs.contains_key(path) {
            return Err(AppError::RemoteRead(format!("Object does not exist: {}", path)));
        }
        Ok(format!(
            "{}{}/{}",
            URL_SCHEME,
            self.bucket,
            urlencoding::encode(path)
        ))
    }

    fn url_to_path(&self, url: &str) -> Result<String> {
        let prefix = format!("{}{}/", URL_SCHEME, self.bucket);
        let encoded = url
            .strip_prefix(&prefix)
            .ok_or_else(|| AppError::InvalidInput(format!("Not a blob URL for this bucket: {}", url)))?;
        urlencoding::decode(encoded)
            .map(|path| path.into_owned())
            .map_err(|e| AppError::InvalidInput(format!("Malformed blob URL {}: {}", url, e)))
    }
}

#[async_trait]
impl AuthProvider for InMemoryGateway {
    fn current_session(&self) -> Option<Session> {
        self.session.current()
    }

    async fn send_verification_for_email_change(
        &self,
        session: &Session,
        new_email: &str,
    ) -> Result<()> {
        self.check(FailPoint::SendVerification, AppError::RemoteWrite)?;

        self.sent_verifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((session.user_id.clone(), new_email.to_string()));
        Ok(())
    }

    fn sign_out(&self) {
        self.session.clear();
    }

    async fn lookup_accounts_by_email(&self, email: &str) -> Result<Vec<String>> {
        self.check(FailPoint::LookupAccounts, AppError::RemoteRead)?;

        Ok(self
            .accounts
            .get(email)
            .map(|methods| methods.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn gateway() -> InMemoryGateway {
        InMemoryGateway::new("bucket", SessionStore::new())
    }

    #[tokio::test]
    async fn test_update_field_requires_existing_document() {
        let gw = gateway();
        let err = gw
            .update_field("Users", "missing", "image", json!("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RemoteWrite(_)));

        gw.set("Users", "u1", doc(json!({"firstName": "A"})))
            .await
            .unwrap();
        gw.update_field("Users", "u1", "image", json!("x"))
            .await
            .unwrap();

        let stored = gw.get("Users", "u1").await.unwrap().unwrap();
        assert_eq!(stored.get("firstName"), Some(&json!("A")));
        assert_eq!(stored.get("image"), Some(&json!("x")));
    }

    #[tokio::test]
    async fn test_blob_url_round_trip() {
        let gw = gateway();
        gw.put("profile_images/u 1.png", vec![1], "image/png")
            .await
            .unwrap();

        let url = gw.resolve_url("profile_images/u 1.png").await.unwrap();
        assert!(url.starts_with("memory://bucket/"));
        assert_eq!(gw.url_to_path(&url).unwrap(), "profile_images/u 1.png");
        assert!(gw.url_to_path("https://elsewhere/x.png").is_err());
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_and_change_snapshots() {
        let gw = gateway();
        gw.set("Users", "a", doc(json!({}))).await.unwrap();

        let mut rx = gw.subscribe("Users");
        let initial = rx.recv().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        gw.set("Users", "b", doc(json!({}))).await.unwrap();
        let next = rx.recv().await.unwrap().unwrap();
        assert_eq!(
            next.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        // Writes to other collections do not notify.
        gw.set("Posts", "p", doc(json!({}))).await.unwrap();
        assert!(rx.try_recv().is_err());

        drop(rx);
        assert_eq!(gw.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures_use_matching_kinds() {
        let gw = gateway();
        gw.fail_on(FailPoint::PutBlob);
        gw.fail_on(FailPoint::Get);

        assert!(matches!(
            gw.put("p", vec![], "image/jpeg").await,
            Err(AppError::Upload(_))
        ));
        assert!(matches!(
            gw.get("Users", "u").await,
            Err(AppError::RemoteRead(_))
        ));

        gw.clear_failure(FailPoint::PutBlob);
        assert!(gw.put("p", vec![], "image/jpeg").await.is_ok());
    }
}
