//! Email change and email ownership checks.

use crate::error::{AppError, Result};
use crate::gateway::AuthProvider;
use std::sync::Arc;
use validator::ValidateEmail;

/// Outcome of an email ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailAvailability {
    /// Unused, or already owned by the asking user.
    Available,
    /// Claimed by another account, or the check could not be completed.
    Unavailable,
}

impl EmailAvailability {
    pub fn is_available(self) -> bool {
        self == EmailAvailability::Available
    }
}

/// Coordinates email changes against the auth provider.
pub struct EmailChangeFlow {
    auth: Arc<dyn AuthProvider>,
}

impl EmailChangeFlow {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { auth }
    }

    /// Ask the auth provider to verify `new_email`, then sign out.
    ///
    /// The session is only dropped once the verification message has been
    /// dispatched; the user must sign in again after confirming.
    pub async fn request_email_change(&self, new_email: &str) -> Result<()> {
        let session = self.auth.current_session().ok_or_else(|| {
            tracing::warn!("Email change requested without a session");
            AppError::NotAuthenticated
        })?;

        if !new_email.validate_email() {
            return Err(AppError::InvalidInput(format!(
                "Not an email address: {}",
                new_email
            )));
        }

        self.auth
            .send_verification_for_email_change(&session, new_email)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    user_id = %session.user_id,
                    kind = e.kind(),
                    error = %e,
                    "Error sending email change verification"
                )
            })?;

        self.auth.sign_out();
        tracing::info!(user_id = %session.user_id, "Email change verification sent, session closed");
        Ok(())
    }

    /// Whether `email` may be claimed by `user_id`.
    ///
    /// Fails closed: any lookup error reports [`EmailAvailability::Unavailable`].
    pub async fn verify_email_ownership(&self, email: &str, user_id: &str) -> EmailAvailability {
        let accounts = match self.auth.lookup_accounts_by_email(email).await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!(user_id, kind = e.kind(), error = %e, "Error verifying email");
                return EmailAvailability::Unavailable;
            }
        };

        if accounts.is_empty() {
            return EmailAvailability::Available;
        }

        match self.auth.current_session() {
            Some(session) if session.user_id == user_id && session.email == email => {
                EmailAvailability::Available
            }
            _ => EmailAvailability::Unavailable,
        }
    }
}
