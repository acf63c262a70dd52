// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared by every gateway and flow.

use crate::config::ConfigError;

/// Application error type.
///
/// Each variant is one failure kind a caller may want to branch on. Remote
/// details are carried as strings because they come from several SDKs.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("Remote read failed: {0}")]
    RemoteRead(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable kind name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::RemoteWrite(_) => "remote_write",
            AppError::RemoteRead(_) => "remote_read",
            AppError::Upload(_) => "upload",
            AppError::NotAuthenticated => "not_authenticated",
            AppError::RecordNotFound(_) => "record_not_found",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Result type alias for gateway calls and flows.
pub type Result<T> = std::result::Result<T, AppError>;
