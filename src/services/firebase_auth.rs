// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication client (Identity Toolkit REST API).
//!
//! Handles:
//! - Password sign-in (establishes the session)
//! - Verify-before-change email requests
//! - Account lookup by email
//! - Local sign-out

use crate::error::AppError;
use crate::gateway::AuthProvider;
use crate::models::{Session, SessionStore};
use async_trait::async_trait;
use serde::Deserialize;

/// Continue URL required by `createAuthUri`; never visited.
const LOOKUP_CONTINUE_URI: &str = "http://localhost";

/// Firebase Authentication client.
#[derive(Clone)]
pub struct FirebaseAuth {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: SessionStore,
}

impl FirebaseAuth {
    /// Create a new auth client bound to `session`.
    ///
    /// For local development with emulator, set FIREBASE_AUTH_EMULATOR_HOST.
    pub fn new(api_key: &str, session: SessionStore) -> Self {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth Emulator");
                format!("http://{}/identitytoolkit.googleapis.com/v1", host)
            }
            Err(_) => "https://identitytoolkit.googleapis.com/v1".to_string(),
        };
        Self::with_base_url(base_url, api_key, session)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: &str, session: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.to_string(),
            session,
        }
    }

    /// Sign in with email and password and store the resulting session.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response: SignInResponse = self
            .post_json("accounts:signInWithPassword", &body)
            .await
            .map_err(sign_in_error)?;

        let session = Session {
            user_id: response.local_id,
            email: response.email,
            id_token: response.id_token,
        };
        self.session.set(session.clone());

        tracing::info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    /// POST a JSON body to an Identity Toolkit method.
    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, IdentityError> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected(format!(
                "{} HTTP {}: {}",
                method,
                status,
                error_message(&body)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Decode(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuth {
    fn current_session(&self) -> Option<Session> {
        self.session.current()
    }

    async fn send_verification_for_email_change(
        &self,
        session: &Session,
        new_email: &str,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "requestType": "VERIFY_AND_CHANGE_EMAIL",
            "idToken": session.id_token,
            "newEmail": new_email,
        });

        let _: serde_json::Value = self
            .post_json("accounts:sendOobCode", &body)
            .await
            .map_err(|e| match e {
                IdentityError::Transport(msg) | IdentityError::Rejected(msg) => {
                    AppError::RemoteWrite(msg)
                }
                IdentityError::Decode(msg) => AppError::RemoteRead(msg),
            })?;
        Ok(())
    }

    fn sign_out(&self) {
        if let Some(session) = self.session.clear() {
            tracing::info!(user_id = %session.user_id, "Signed out");
        }
    }

    async fn lookup_accounts_by_email(&self, email: &str) -> Result<Vec<String>, AppError> {
        let body = serde_json::json!({
            "identifier": email,
            "continueUri": LOOKUP_CONTINUE_URI,
        });

        let response: CreateAuthUriResponse = self
            .post_json("accounts:createAuthUri", &body)
            .await
            .map_err(|e| AppError::RemoteRead(e.into_message()))?;

        Ok(response.sign_in_methods())
    }
}

/// Failure of one Identity Toolkit call, before mapping to [`AppError`].
#[derive(Debug)]
enum IdentityError {
    /// No HTTP response (DNS, connect, TLS, timeout).
    Transport(String),
    /// The service answered with a non-success status.
    Rejected(String),
    /// The response body did not have the expected shape.
    Decode(String),
}

impl IdentityError {
    fn into_message(self) -> String {
        match self {
            IdentityError::Transport(msg)
            | IdentityError::Rejected(msg)
            | IdentityError::Decode(msg) => msg,
        }
    }
}

/// Only a rejected request means bad credentials; an unreachable service
/// stays a remote failure.
fn sign_in_error(e: IdentityError) -> AppError {
    match e {
        IdentityError::Rejected(msg) => {
            tracing::warn!(error = %msg, "Password sign-in rejected");
            AppError::NotAuthenticated
        }
        IdentityError::Transport(msg) | IdentityError::Decode(msg) => {
            tracing::error!(error = %msg, "Password sign-in failed");
            AppError::RemoteRead(msg)
        }
    }
}

/// Extract `error.message` from an Identity Toolkit error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// `accounts:signInWithPassword` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
}

/// `accounts:createAuthUri` response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuthUriResponse {
    #[serde(default)]
    registered: bool,
    #[serde(default)]
    signin_methods: Vec<String>,
}

impl CreateAuthUriResponse {
    /// Sign-in methods for the email.
    ///
    /// With email enumeration protection enabled the method list is withheld;
    /// `registered` still marks a known account.
    fn sign_in_methods(self) -> Vec<String> {
        if self.signin_methods.is_empty() && self.registered {
            vec!["unknown".to_string()]
        } else {
            self.signin_methods
        }
    }
}
