// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`DocumentStore`].
//!
//! Documents are written as plain maps; ids are generated client-side.
//! Live queries use the Firestore listen API. The first snapshot is read once
//! the target is CURRENT; after that every document event re-reads the
//! collection so subscribers always get a full snapshot.

use crate::error::AppError;
use crate::gateway::{Document, DocumentSnapshot, DocumentStore, SnapshotReceiver, SnapshotSender};
use async_trait::async_trait;
use firestore::{
    FirestoreListenEvent, FirestoreListenerTarget, FirestoreMemListenStateStorage,
    FirestoreWritePrecondition,
};
use gcloud_sdk::google::firestore::v1::target_change::TargetChangeType;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Listen target id used for collection subscriptions.
const COLLECTION_TARGET: FirestoreListenerTarget = FirestoreListenerTarget::new(17_u32);

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::RemoteRead(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::RemoteRead(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

/// Read every document of `collection` as id + body pairs.
async fn read_collection(
    client: &firestore::FirestoreDb,
    collection: &str,
) -> Result<Vec<DocumentSnapshot>, AppError> {
    let docs = client
        .fluent()
        .select()
        .from(collection)
        .query()
        .await
        .map_err(|e| AppError::RemoteRead(e.to_string()))?;

    docs.iter()
        .map(|doc| {
            let data = firestore::FirestoreDb::deserialize_doc_to::<Document>(doc)
                .map_err(|e| AppError::RemoteRead(e.to_string()))?;
            // Document names end in `/{collection}/{id}`.
            let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
            Ok(DocumentSnapshot { id, data })
        })
        .collect()
}

/// Whether a listen event should produce a fresh snapshot.
///
/// Document events that replay the existing collection arrive before the
/// target turns CURRENT and are skipped; the CURRENT marker itself yields the
/// first snapshot.
fn should_refresh(event: &FirestoreListenEvent, synced: &AtomicBool) -> bool {
    match event {
        FirestoreListenEvent::TargetChange(change) => {
            change.target_change_type == TargetChangeType::Current as i32
                && !synced.swap(true, Ordering::AcqRel)
        }
        FirestoreListenEvent::DocumentChange(_)
        | FirestoreListenEvent::DocumentDelete(_)
        | FirestoreListenEvent::DocumentRemove(_) => synced.load(Ordering::Acquire),
        _ => false,
    }
}

/// Run a Firestore listener for `collection` until `tx` is closed.
async fn run_listener(client: firestore::FirestoreDb, collection: String, tx: SnapshotSender) {
    let mut listener = match client
        .create_listener(FirestoreMemListenStateStorage::new())
        .await
    {
        Ok(listener) => listener,
        Err(e) => {
            let _ = tx.send(Err(AppError::RemoteRead(format!(
                "Failed to create listener: {}",
                e
            ))));
            return;
        }
    };

    if let Err(e) = client
        .fluent()
        .select()
        .from(collection.as_str())
        .listen()
        .add_target(COLLECTION_TARGET, &mut listener)
    {
        let _ = tx.send(Err(AppError::RemoteRead(format!(
            "Failed to add listen target: {}",
            e
        ))));
        return;
    }

    let synced = AtomicBool::new(false);
    let events_tx = tx.clone();
    let events_client = client.clone();
    let events_collection = collection.clone();
    let started = listener
        .start(move |event: FirestoreListenEvent| {
            let tx = events_tx.clone();
            let client = events_client.clone();
            let collection = events_collection.clone();
            let refresh = should_refresh(&event, &synced);
            async move {
                if refresh {
                    let _ = tx.send(read_collection(&client, &collection).await);
                }
                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            }
        })
        .await;

    if let Err(e) = started {
        let _ = tx.send(Err(AppError::RemoteRead(format!(
            "Failed to start listener: {}",
            e
        ))));
        return;
    }

    tracing::debug!(collection = %collection, "Firestore listener started");

    // Unsubscribing drops the receiver.
    tx.closed().await;

    if let Err(e) = listener.shutdown().await {
        tracing::warn!(collection = %collection, error = %e, "Failed to shut down listener");
    } else {
        tracing::debug!(collection = %collection, "Firestore listener stopped");
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn create(&self, collection: &str, doc: Document) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;
        Ok(())
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), AppError> {
        let mut patch = Document::new();
        patch.insert(field.to_string(), value);

        let _: () = self
            .client
            .fluent()
            .update()
            .fields([field])
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::RemoteRead(e.to_string()))
    }

    fn subscribe(&self, collection: &str) -> SnapshotReceiver {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_listener(self.client.clone(), collection.to_string(), tx));

        rx
    }
}
