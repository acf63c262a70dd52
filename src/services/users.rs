// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User record store: CRUD plus a single live subscription over the users
//! collection.

use crate::error::{AppError, Result};
use crate::gateway::DocumentStore;
use crate::models::UserProfile;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;

/// One callback registration: its delivery task and its live flag.
///
/// The flag is cleared before the task is aborted. The task checks it right
/// before each callback, so a task still inside a callback when it is
/// displaced cannot deliver another snapshot.
#[derive(Debug, Clone)]
struct Registration {
    handle: AbortHandle,
    live: Arc<AtomicBool>,
}

impl Registration {
    fn cancel(&self) {
        self.live.store(false, Ordering::Release);
        self.handle.abort();
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) && !self.handle.is_finished()
    }
}

/// Handle for one live subscription.
///
/// Dropping the handle does not cancel the subscription; use
/// [`UserSubscription::cancel`] or [`UserRecordStore::unsubscribe`].
#[derive(Debug, Clone)]
pub struct UserSubscription {
    registration: Registration,
}

impl UserSubscription {
    /// Stop delivering snapshots to this subscription's callback.
    pub fn cancel(&self) {
        self.registration.cancel();
    }

    /// False as soon as the subscription is cancelled or replaced.
    pub fn is_active(&self) -> bool {
        self.registration.is_live()
    }
}

/// CRUD operations and the live subscription over user records.
pub struct UserRecordStore {
    docs: Arc<dyn DocumentStore>,
    collection: String,
    strict_delete: bool,
    /// Single subscription slot; a new subscription replaces the old one.
    listener: Mutex<Option<Registration>>,
}

impl UserRecordStore {
    pub fn new(docs: Arc<dyn DocumentStore>, collection: &str, strict_delete: bool) -> Self {
        Self {
            docs,
            collection: collection.to_string(),
            strict_delete,
            listener: Mutex::new(None),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create a user record. Returns the id chosen by the store.
    pub async fn add(&self, user: &UserProfile) -> Result<String> {
        let doc = user
            .to_document()
            .map_err(|e| AppError::RemoteWrite(format!("Failed to encode user: {}", e)))?;

        let id = self
            .docs
            .create(&self.collection, doc)
            .await
            .inspect_err(|e| tracing::error!(kind = e.kind(), error = %e, "Error adding user"))?;

        tracing::info!(user_id = %id, "User added");
        Ok(id)
    }

    /// Fetch a user record by id.
    pub async fn get(&self, id: &str) -> Result<UserProfile> {
        let doc = self
            .docs
            .get(&self.collection, id)
            .await?
            .ok_or_else(|| AppError::RecordNotFound(id.to_string()))?;

        UserProfile::from_document(id, doc)
            .map_err(|e| AppError::RemoteRead(format!("Malformed user document {}: {}", id, e)))
    }

    /// Replace the record at `user.id` with `user` (no field merging).
    pub async fn update(&self, user: &UserProfile) -> Result<()> {
        if user.id.is_empty() {
            return Err(AppError::RemoteWrite(
                "Cannot update a user without an id".to_string(),
            ));
        }

        let doc = user
            .to_document()
            .map_err(|e| AppError::RemoteWrite(format!("Failed to encode user: {}", e)))?;

        self.docs
            .set(&self.collection, &user.id, doc)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id = %user.id, kind = e.kind(), error = %e, "Error updating user")
            })?;

        tracing::debug!(user_id = %user.id, "User updated");
        Ok(())
    }

    /// Delete the record at `user.id`.
    ///
    /// An absent id succeeds unless the store was built with `strict_delete`.
    pub async fn delete(&self, user: &UserProfile) -> Result<()> {
        if user.id.is_empty() {
            return Err(AppError::RemoteWrite(
                "Cannot delete a user without an id".to_string(),
            ));
        }

        if self.strict_delete {
            let exists = self
                .docs
                .get(&self.collection, &user.id)
                .await
                .map_err(|e| AppError::RemoteWrite(format!("Existence check failed: {}", e)))?
                .is_some();
            if !exists {
                return Err(AppError::RecordNotFound(user.id.clone()));
            }
        }

        self.docs
            .delete(&self.collection, &user.id)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id = %user.id, kind = e.kind(), error = %e, "Error deleting user")
            })?;

        tracing::info!(user_id = %user.id, "User deleted");
        Ok(())
    }

    /// Subscribe to the full list of users.
    ///
    /// `on_changed` receives the current snapshot immediately and again after
    /// every change. A previous subscription on this store is cancelled first.
    /// Snapshot errors are logged and never reach the callback.
    pub fn subscribe<F>(&self, on_changed: F) -> UserSubscription
    where
        F: Fn(Vec<UserProfile>) + Send + Sync + 'static,
    {
        let mut slot = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = slot.take() {
            previous.cancel();
            tracing::debug!(collection = %self.collection, "Replaced user subscription");
        }

        let mut snapshots = self.docs.subscribe(&self.collection);
        let collection = self.collection.clone();
        let live = Arc::new(AtomicBool::new(true));
        let task_live = live.clone();

        let task = tokio::spawn(async move {
            while let Some(update) = snapshots.recv().await {
                match update {
                    Ok(docs) => {
                        let users: Vec<UserProfile> = docs
                            .into_iter()
                            .filter_map(|doc| {
                                let id = doc.id.clone();
                                UserProfile::from_snapshot(doc)
                                    .inspect_err(|e| {
                                        tracing::warn!(user_id = %id, error = %e, "Skipping malformed user document")
                                    })
                                    .ok()
                            })
                            .collect();
                        if !task_live.load(Ordering::Acquire) {
                            break;
                        }
                        on_changed(users);
                    }
                    Err(e) => {
                        tracing::error!(
                            collection = %collection,
                            kind = e.kind(),
                            error = %e,
                            "Error fetching users"
                        );
                    }
                }
            }
        });

        let registration = Registration {
            handle: task.abort_handle(),
            live,
        };
        *slot = Some(registration.clone());
        UserSubscription { registration }
    }

    /// Cancel the active subscription, if any.
    pub fn unsubscribe(&self) {
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(registration) = previous {
            registration.cancel();
            tracing::debug!(collection = %self.collection, "User subscription cancelled");
        }
    }
}

impl Drop for UserRecordStore {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
