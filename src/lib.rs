// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Inzure: profile and account core for the Inzure insurance client
//!
//! This crate holds the user record store, the profile image replacement
//! flow and the email change flow, backed by Firebase (Firestore, Cloud
//! Storage, Authentication) or by an in-memory gateway.

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;

use config::Config;
use gateway::{AuthProvider, BlobStore, DocumentStore};
use models::SessionStore;
use services::{EmailChangeFlow, ProfileImageSync, UserRecordStore};
use std::sync::Arc;

/// Application context: owns the configuration, the session and the
/// gateway handles, and the flows built on them.
pub struct AppContext {
    pub config: Config,
    pub session: SessionStore,
    pub users: UserRecordStore,
    pub profile_images: ProfileImageSync,
    pub email_change: EmailChangeFlow,
}

impl AppContext {
    pub fn new(
        config: Config,
        session: SessionStore,
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let users = UserRecordStore::new(
            docs.clone(),
            &config.users_collection,
            config.strict_delete,
        );
        let profile_images = ProfileImageSync::new(
            docs,
            blobs,
            &config.users_collection,
            &config.profile_image_prefix,
        );
        let email_change = EmailChangeFlow::new(auth);

        Self {
            config,
            session,
            users,
            profile_images,
            email_change,
        }
    }
}
