// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile image replacement.
//!
//! The three remote effects (delete old blob, upload new blob, relink the
//! record) run in order with no transaction across the blob and document
//! stores:
//! - a failed delete of the old blob is logged and skipped
//! - a failed upload aborts with the record still pointing at the old URL
//! - a failed relink leaves the new blob uploaded but unreferenced

use crate::error::{AppError, Result};
use crate::gateway::{BlobStore, DocumentStore};
use crate::models::user::IMAGE_FIELD;
use crate::models::ImageSource;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Replaces a user's profile image and updates the linked record.
pub struct ProfileImageSync {
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    collection: String,
    image_prefix: String,
}

impl ProfileImageSync {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        collection: &str,
        image_prefix: &str,
    ) -> Self {
        Self {
            docs,
            blobs,
            collection: collection.to_string(),
            image_prefix: image_prefix.to_string(),
        }
    }

    /// Read `path` from disk and use it as the new profile image.
    pub async fn replace_from_file(&self, user_id: &str, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::Upload(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let source = ImageSource::new(path.to_string_lossy(), bytes);
        self.replace(user_id, source).await
    }

    /// Replace the profile image of `user_id` and return the new image URL.
    pub async fn replace(&self, user_id: &str, source: ImageSource) -> Result<String> {
        // 1. Current record, for the previous image reference
        let doc = self
            .docs
            .get(&self.collection, user_id)
            .await?
            .ok_or_else(|| AppError::RecordNotFound(user_id.to_string()))?;

        // 2. Best-effort removal of the previous blob
        let old_url = doc
            .get(IMAGE_FIELD)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty());
        if let Some(old_url) = old_url {
            self.delete_previous(user_id, old_url).await;
        }

        // 3-4. Upload under a name derived from the user id
        let path = source.blob_path(&self.image_prefix, user_id);
        let content_type = source.content_type();

        self.blobs
            .put(&path, source.bytes, content_type)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id, path = %path, kind = e.kind(), error = %e, "Profile image upload failed")
            })?;

        // 5. Retrieval URL
        let url = self.blobs.resolve_url(&path).await.inspect_err(|e| {
            tracing::error!(user_id, path = %path, kind = e.kind(), error = %e, "Failed to resolve image URL")
        })?;

        // 6. Relink the record
        self.docs
            .update_field(&self.collection, user_id, IMAGE_FIELD, Value::String(url.clone()))
            .await
            .inspect_err(|e| {
                tracing::error!(
                    user_id,
                    path = %path,
                    kind = e.kind(),
                    error = %e,
                    "Uploaded image left unlinked"
                )
            })?;

        tracing::info!(user_id, path = %path, "Profile image replaced");
        Ok(url)
    }

    async fn delete_previous(&self, user_id: &str, old_url: &str) {
        let old_path = match self.blobs.url_to_path(old_url) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(user_id, url = old_url, kind = e.kind(), error = %e, "Cannot resolve previous image");
                return;
            }
        };

        match self.blobs.delete(&old_path).await {
            Ok(()) => tracing::debug!(user_id, path = %old_path, "Previous image deleted"),
            Err(e) => tracing::warn!(
                user_id,
                path = %old_path,
                kind = e.kind(),
                error = %e,
                "Error deleting previous image"
            ),
        }
    }
}
