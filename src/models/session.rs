//! Authenticated session state.
//!
//! The session is owned by the application context and shared by reference
//! with the adapters that need it; there is no process-global auth state.

use std::sync::{Arc, RwLock};

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Auth account id (also the user record's document id)
    pub user_id: String,
    pub email: String,
    /// Bearer credential for backend calls made on behalf of the user
    pub id_token: String,
}

/// Shared slot holding the current session, if any.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, session: Session) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session);
    }

    /// Drop the current session. Returns the session that was active.
    pub fn clear(&self) -> Option<Session> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current().is_some()
    }
}
