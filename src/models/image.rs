//! Image sources for profile picture uploads.

/// Extension used when the source name does not carry one.
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Raw image bytes plus the name (path or URI) they were read from.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Extension of the last path segment, or `jpg` when there is none.
    ///
    /// Query strings and fragments of URI names are ignored.
    pub fn extension(&self) -> String {
        let segment = self.last_segment();
        match segment.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_string(),
            _ => DEFAULT_IMAGE_EXTENSION.to_string(),
        }
    }

    fn last_segment(&self) -> String {
        // Single-letter schemes are Windows drive letters, not URIs.
        if let Ok(uri) = url::Url::parse(&self.name) {
            if uri.scheme().len() > 1 {
                if let Some(segment) = uri.path_segments().and_then(|segments| segments.last()) {
                    return segment.to_string();
                }
            }
        }

        let path = self.name.split(['?', '#']).next().unwrap_or_default();
        path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
    }

    /// MIME type sent with the upload.
    pub fn content_type(&self) -> &'static str {
        match self.extension().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "bmp" => "image/bmp",
            _ => "application/octet-stream",
        }
    }

    /// Blob path for a user's profile image: `{prefix}/{user_id}.{ext}`.
    pub fn blob_path(&self, prefix: &str, user_id: &str) -> String {
        if prefix.is_empty() {
            format!("{}.{}", user_id, self.extension())
        } else {
            format!("{}/{}.{}", prefix, user_id, self.extension())
        }
    }
}
