//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development. Emulator hosts are read
//! directly by the adapters that support them.

use std::env;

/// Default Firestore collection holding user profiles.
pub const DEFAULT_USERS_COLLECTION: &str = "Users";

/// Default blob prefix for profile images.
pub const DEFAULT_PROFILE_IMAGE_PREFIX: &str = "profile_images";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase / GCP project ID
    pub firebase_project_id: String,
    /// Web API key used by the Identity Toolkit endpoints
    pub firebase_api_key: String,
    /// Cloud Storage bucket for uploaded blobs
    pub storage_bucket: String,
    /// Collection holding user profiles
    pub users_collection: String,
    /// Blob prefix under which profile images are stored
    pub profile_image_prefix: String,
    /// Whether deleting an absent user record is reported as not found
    pub strict_delete: bool,
}

impl Config {
    /// Offline configuration for tests.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: "test-project".to_string(),
            firebase_api_key: "test-api-key".to_string(),
            storage_bucket: "test-project.appspot.com".to_string(),
            users_collection: DEFAULT_USERS_COLLECTION.to_string(),
            profile_image_prefix: DEFAULT_PROFILE_IMAGE_PREFIX.to_string(),
            strict_delete: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let firebase_project_id = env::var("FIREBASE_PROJECT_ID")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?;

        Ok(Self {
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            storage_bucket: env::var("FIREBASE_STORAGE_BUCKET")
                .unwrap_or_else(|_| format!("{}.appspot.com", firebase_project_id)),
            users_collection: env::var("INZURE_USERS_COLLECTION")
                .unwrap_or_else(|_| DEFAULT_USERS_COLLECTION.to_string()),
            profile_image_prefix: env::var("INZURE_PROFILE_IMAGE_PREFIX")
                .map(|v| v.trim_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_PROFILE_IMAGE_PREFIX.to_string()),
            strict_delete: match env::var("INZURE_STRICT_DELETE") {
                Ok(v) => parse_flag("INZURE_STRICT_DELETE", &v)?,
                Err(_) => false,
            },
            firebase_project_id,
        })
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid(name, other.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
