// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inzure runner
//!
//! Connects to Firebase, optionally signs in, and follows the live user
//! list until interrupted.

use inzure::{
    config::Config,
    db::FirestoreDb,
    error::AppError,
    models::SessionStore,
    services::{FirebaseAuth, FirebaseStorage},
    AppContext,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        project = %config.firebase_project_id,
        collection = %config.users_collection,
        "Starting Inzure"
    );

    let session = SessionStore::new();

    let db = FirestoreDb::new(&config.firebase_project_id).await?;
    let storage = FirebaseStorage::new(&config.storage_bucket, session.clone());
    let auth = FirebaseAuth::new(&config.firebase_api_key, session.clone());

    if let (Ok(email), Ok(password)) = (
        std::env::var("INZURE_EMAIL"),
        std::env::var("INZURE_PASSWORD"),
    ) {
        auth.sign_in_with_password(&email, &password).await?;
    }

    let ctx = AppContext::new(
        config,
        session,
        Arc::new(db),
        Arc::new(storage),
        Arc::new(auth),
    );

    let subscription = ctx.users.subscribe(|users| {
        tracing::info!(count = users.len(), "User list updated");
    });

    tokio::signal::ctrl_c().await.map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Failed to listen for shutdown signal: {}", e))
    })?;
    tracing::info!("Shutting down");

    subscription.cancel();
    ctx.users.unsubscribe();
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inzure=debug,info")),
        )
        .with(format)
        .init();
}
