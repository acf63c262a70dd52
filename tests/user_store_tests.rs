// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User record CRUD against the in-memory gateway.

use inzure::config::Config;
use inzure::error::AppError;
use inzure::gateway::FailPoint;
use serde_json::json;

mod common;
use common::{test_context, test_context_with, test_user};

#[tokio::test]
async fn test_add_then_get_returns_input_with_assigned_id() {
    let (ctx, gateway) = test_context();
    let mut user = test_user("Ana");
    user.image = Some("https://cdn.example.com/ana.jpg".to_string());
    user.attributes.insert("phone".to_string(), json!("555-0100"));

    let id = ctx.users.add(&user).await.unwrap();
    assert!(!id.is_empty());
    assert_eq!(gateway.document_count("Users"), 1);

    let fetched = ctx.users.get(&id).await.unwrap();
    assert_eq!(fetched, user.clone().with_id(id));
}

#[tokio::test]
async fn test_add_ignores_caller_supplied_id() {
    let (ctx, _gateway) = test_context();
    let user = test_user("Ben").with_id("chosen-by-caller");

    let id = ctx.users.add(&user).await.unwrap();

    assert_ne!(id, "chosen-by-caller");
    assert!(matches!(
        ctx.users.get("chosen-by-caller").await,
        Err(AppError::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_update_is_full_overwrite() {
    let (ctx, _gateway) = test_context();
    let mut original = test_user("Cleo");
    original.image = Some("https://cdn.example.com/cleo.jpg".to_string());
    original.attributes.insert("role".to_string(), json!("agent"));
    let id = ctx.users.add(&original).await.unwrap();

    // No image, no attributes: both must be gone afterwards.
    let replacement = test_user("Cleopatra").with_id(id.clone());
    ctx.users.update(&replacement).await.unwrap();

    let fetched = ctx.users.get(&id).await.unwrap();
    assert_eq!(fetched, replacement);
    assert_eq!(fetched.image, None);
    assert!(fetched.attributes.is_empty());
}

#[tokio::test]
async fn test_update_without_id_is_write_error() {
    let (ctx, _gateway) = test_context();
    let err = ctx.users.update(&test_user("Dan")).await.unwrap_err();
    assert!(matches!(err, AppError::RemoteWrite(_)));
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let (ctx, gateway) = test_context();
    let id = ctx.users.add(&test_user("Eve")).await.unwrap();
    let user = ctx.users.get(&id).await.unwrap();

    ctx.users.delete(&user).await.unwrap();

    assert!(matches!(
        ctx.users.get(&id).await,
        Err(AppError::RecordNotFound(missing)) if missing == id
    ));
    assert_eq!(gateway.document_count("Users"), 0);
}

#[tokio::test]
async fn test_delete_absent_id_succeeds_by_default() {
    let (ctx, _gateway) = test_context();
    let ghost = test_user("Ghost").with_id("never-existed");
    assert!(ctx.users.delete(&ghost).await.is_ok());
}

#[tokio::test]
async fn test_strict_delete_reports_absent_id() {
    let config = Config {
        strict_delete: true,
        ..Config::test_default()
    };
    let (ctx, _gateway) = test_context_with(config);

    let ghost = test_user("Ghost").with_id("never-existed");
    assert!(matches!(
        ctx.users.delete(&ghost).await,
        Err(AppError::RecordNotFound(_))
    ));

    let id = ctx.users.add(&test_user("Real")).await.unwrap();
    let real = ctx.users.get(&id).await.unwrap();
    assert!(ctx.users.delete(&real).await.is_ok());
}

#[tokio::test]
async fn test_gateway_failures_surface_error_kinds() {
    let (ctx, gateway) = test_context();
    let id = ctx.users.add(&test_user("Fay")).await.unwrap();
    let user = ctx.users.get(&id).await.unwrap();

    gateway.fail_on(FailPoint::Create);
    gateway.fail_on(FailPoint::Set);
    gateway.fail_on(FailPoint::DeleteDocument);
    gateway.fail_on(FailPoint::Get);

    assert_eq!(
        ctx.users.add(&test_user("Gus")).await.unwrap_err().kind(),
        "remote_write"
    );
    assert_eq!(ctx.users.update(&user).await.unwrap_err().kind(), "remote_write");
    assert_eq!(ctx.users.delete(&user).await.unwrap_err().kind(), "remote_write");
    assert_eq!(ctx.users.get(&id).await.unwrap_err().kind(), "remote_read");

    // Nothing was written locally by the failed calls.
    gateway.clear_failure(FailPoint::Get);
    assert_eq!(gateway.document_count("Users"), 1);
    assert_eq!(ctx.users.get(&id).await.unwrap(), user);
}

#[tokio::test]
async fn test_custom_collection_is_used() {
    let config = Config {
        users_collection: "Clients".to_string(),
        ..Config::test_default()
    };
    let (ctx, gateway) = test_context_with(config);

    ctx.users.add(&test_user("Hal")).await.unwrap();

    assert_eq!(ctx.users.collection(), "Clients");
    assert_eq!(gateway.document_count("Clients"), 1);
    assert_eq!(gateway.document_count("Users"), 0);
}
