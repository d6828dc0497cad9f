use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use super::format::{self, MediaType, MAX_FILE_SIZE};
use super::ImportError;

/// A validated in-memory document, ready for extraction.
///
/// Construction is the only gate: once a `Document` exists, its declared
/// format is supported and agrees with the content's magic bytes.
#[derive(Clone)]
pub struct Document {
    id: Uuid,
    name: String,
    media_type: MediaType,
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: &str, declared_mime: &str, bytes: Vec<u8>) -> Result<Self, ImportError> {
        let media_type =
            MediaType::from_mime(declared_mime).ok_or_else(|| ImportError::UnsupportedFormat {
                declared: declared_mime.to_string(),
            })?;

        if bytes.len() as u64 > MAX_FILE_SIZE {
            return Err(ImportError::FileTooLarge {
                size_mb: bytes.len() as f64 / (1024.0 * 1024.0),
                max_mb: MAX_FILE_SIZE / (1024 * 1024),
            });
        }

        format::verify_content(media_type, &bytes)?;

        let name = format::sanitize_filename(name);
        debug!(
            name = %name,
            media_type = media_type.as_str(),
            size_bytes = bytes.len(),
            "document accepted"
        );
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            media_type,
            bytes,
        })
    }

    /// Load from disk, guessing the declared MIME type from the extension.
    /// Content verification still applies, so a mislabeled file is caught.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let bytes = std::fs::read(path)?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document");
        Self::new(name, mime.essence_str(), bytes)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

// Manual Debug keeps document content out of logs.
impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}
