//! User profile model for storage and snapshots.

use crate::gateway::{Document, DocumentSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field holding the profile image URL.
pub const IMAGE_FIELD: &str = "image";

/// User profile stored in the users collection.
///
/// The document id is carried in `id` but never serialized into the
/// document body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Document ID (assigned by the store on creation)
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Mirrors the auth account's verified email
    #[serde(default)]
    pub email: String,
    /// Download URL of the current profile image
    #[serde(default)]
    pub image: Option<String>,
    /// Any other profile attributes present on the document
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, Value>,
}

impl UserProfile {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Same profile bound to a different document id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Current image reference, treating an empty string as absent.
    pub fn image_url(&self) -> Option<&str> {
        self.image.as_deref().filter(|url| !url.is_empty())
    }

    /// Serialize into a document body without any self-referential id.
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(mut doc) => {
                doc.remove("id");
                Ok(doc)
            }
            other => Err(serde::ser::Error::custom(format!(
                "user profile serialized to non-object: {}",
                other
            ))),
        }
    }

    /// Map a stored document back into a profile bound to `id`.
    pub fn from_document(id: &str, doc: Document) -> Result<Self, serde_json::Error> {
        let mut user: UserProfile = serde_json::from_value(Value::Object(doc))?;
        user.attributes.remove("id");
        user.id = id.to_string();
        Ok(user)
    }

    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Result<Self, serde_json::Error> {
        Self::from_document(&snapshot.id, snapshot.data)
    }
}
