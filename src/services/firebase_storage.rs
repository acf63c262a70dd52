// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Storage for Firebase client (`/v0/b/{bucket}/o` REST API).
//!
//! Requests carry the signed-in user's ID token, so storage security rules
//! apply exactly as they would for the mobile SDK.

use crate::error::AppError;
use crate::gateway::BlobStore;
use crate::models::SessionStore;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;

/// Cloud Storage for Firebase client.
#[derive(Clone)]
pub struct FirebaseStorage {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    session: SessionStore,
}

impl FirebaseStorage {
    /// Create a storage client for `bucket`.
    ///
    /// For local development with emulator, set FIREBASE_STORAGE_EMULATOR_HOST.
    pub fn new(bucket: &str, session: SessionStore) -> Self {
        let base_url = match std::env::var("FIREBASE_STORAGE_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Storage Emulator");
                format!("http://{}/v0", host)
            }
            Err(_) => "https://firebasestorage.googleapis.com/v0".to_string(),
        };
        Self::with_base_url(base_url, bucket, session)
    }

    pub fn with_base_url(base_url: impl Into<String>, bucket: &str, session: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            bucket: bucket.to_string(),
            session,
        }
    }

    /// Object URL without query parameters.
    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(path)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.current() {
            Some(session) => {
                request.header("Authorization", format!("Firebase {}", session.id_token))
            }
            None => request,
        }
    }

    /// Return an error describing a non-success response.
    async fn failure(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("HTTP {}: {}", status, body)
    }
}

#[async_trait]
impl BlobStore for FirebaseStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let url = format!("{}/b/{}/o", self.base_url, self.bucket);
        let size = bytes.len();

        let response = self
            .authorize(self.http.post(&url))
            .query(&[("uploadType", "media"), ("name", path)])
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Upload(Self::failure(response).await));
        }

        tracing::debug!(path, size, "Blob uploaded");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let response = self
            .authorize(self.http.delete(self.object_url(path)))
            .send()
            .await
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::RemoteWrite(Self::failure(response).await));
        }

        tracing::debug!(path, "Blob deleted");
        Ok(())
    }

    async fn resolve_url(&self, path: &str) -> Result<String, AppError> {
        let object_url = self.object_url(path);

        let response = self
            .authorize(self.http.get(&object_url))
            .send()
            .await
            .map_err(|e| AppError::RemoteRead(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::RemoteRead(Self::failure(response).await));
        }

        let metadata: ObjectMetadata = response
            .json()
            .await
            .map_err(|e| AppError::RemoteRead(format!("JSON parse error: {}", e)))?;

        Ok(download_url(&object_url, metadata.download_tokens.as_deref()))
    }

    fn url_to_path(&self, url: &str) -> Result<String, AppError> {
        object_path_from_url(url)
    }
}

/// Object metadata; only the download token is needed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    download_tokens: Option<String>,
}

/// Build the public download URL from the first download token, if any.
fn download_url(object_url: &str, tokens: Option<&str>) -> String {
    match tokens
        .and_then(|t| t.split(',').next())
        .filter(|t| !t.is_empty())
    {
        Some(token) => format!("{}?alt=media&token={}", object_url, token),
        None => format!("{}?alt=media", object_url),
    }
}

/// Map a `gs://bucket/path` or `https://…/b/{bucket}/o/{encoded}` URL to an object path.
fn object_path_from_url(url: &str) -> Result<String, AppError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| AppError::InvalidInput(format!("Invalid blob URL {}: {}", url, e)))?;

    if parsed.scheme() == "gs" {
        let path = parsed.path().trim_start_matches('/');
        if path.is_empty() {
            return Err(AppError::InvalidInput(format!("No object in URL: {}", url)));
        }
        return urlencoding::decode(path)
            .map(|p| p.into_owned())
            .map_err(|e| AppError::InvalidInput(format!("Invalid blob URL {}: {}", url, e)));
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    let encoded = segments
        .windows(4)
        .find(|w| w[0] == "b" && w[2] == "o")
        .map(|w| w[3])
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("Not a Firebase Storage URL: {}", url)))?;

    urlencoding::decode(encoded)
        .map(|p| p.into_owned())
        .map_err(|e| AppError::InvalidInput(format!("Invalid blob URL {}: {}", url, e)))
}
