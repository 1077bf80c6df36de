//! Asset stores
//!
//! This module defines the AssetStore trait, the upload input and the
//! path values handed back to callers.

pub mod file;

use crate::digest::Digest;
use std::path::Path;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid extension: {0:?}")]
    InvalidExtension(String),

    #[error("empty upload")]
    Empty,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Longest extension accepted, without the dot
pub const MAX_EXTENSION_LEN: usize = 16;

/// An uploaded file, alive for the duration of one store call
#[derive(Debug, Clone)]
pub struct Upload {
    /// Raw file content
    pub content: Vec<u8>,
    /// Declared extension including the leading dot, or empty
    pub extension: String,
}

impl Upload {
    pub fn new(content: impl Into<Vec<u8>>, extension: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            extension: extension.into(),
        }
    }

    /// Build an upload, deriving the extension from a client filename
    pub fn from_filename(content: impl Into<Vec<u8>>, filename: &str) -> Self {
        Self::new(content, extension_of(filename))
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Extension of a filename including the dot (`photo.PNG` -> `.PNG`).
///
/// Returns an empty string when the name has no extension.
pub fn extension_of(filename: &str) -> String {
    // Browsers on Windows may send the full client path
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Check that an extension can be embedded in a file name
pub fn validate_extension(extension: &str) -> StoreResult<()> {
    if extension.is_empty() {
        return Ok(());
    }
    let valid = extension
        .strip_prefix('.')
        .map(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidExtension(extension.to_string()))
    }
}

/// A file stored under its content digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Content digest
    pub digest: Digest,
    /// Canonical file name (`{digest}{extension}`)
    pub file_name: String,
    /// Public path handed to callers (`/{media}/{file_name}`)
    pub public_path: String,
    /// Whether this call wrote the file (false on the dedup fast path)
    pub written: bool,
}

/// Result of a graceful put: a stored asset or the default fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPath {
    Stored(StoredAsset),
    Default(String),
}

impl AssetPath {
    pub fn as_str(&self) -> &str {
        match self {
            AssetPath::Stored(asset) => &asset.public_path,
            AssetPath::Default(path) => path,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, AssetPath::Default(_))
    }

    pub fn into_string(self) -> String {
        match self {
            AssetPath::Stored(asset) => asset.public_path,
            AssetPath::Default(path) => path,
        }
    }
}

/// Content-addressed asset store
pub trait AssetStore: Send + Sync {
    /// Store content under its digest.
    /// Errors are returned to the caller; see `put` for the graceful variant.
    fn store(&self, content: &[u8], extension: &str) -> StoreResult<StoredAsset>;

    /// Public path of the well-known default asset.
    fn default_path(&self) -> &str;

    /// Store content, degrading to the default path on empty input or any failure.
    fn put(&self, content: &[u8], extension: &str) -> AssetPath {
        if content.is_empty() {
            return AssetPath::Default(self.default_path().to_string());
        }
        match self.store(content, extension) {
            Ok(asset) => AssetPath::Stored(asset),
            Err(e) => {
                log::error!("Error uploading file: {}", e);
                AssetPath::Default(self.default_path().to_string())
            }
        }
    }

    /// Path to reset callers to. Never touches storage.
    fn clear(&self) -> String {
        self.default_path().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.png"), ".png");
        assert_eq!(extension_of("photo.JPG"), ".JPG");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".hidden"), "");
        assert_eq!(extension_of(r"C:\Users\me\face.jpeg"), ".jpeg");
        assert_eq!(extension_of("../../etc/passwd.png"), ".png");
        assert_eq!(extension_of(""), "");
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension("").is_ok());
        assert!(validate_extension(".png").is_ok());
        assert!(validate_extension(".WebP").is_ok());

        for bad in ["png", ".", "./png", ".p/g", ".p g", ".aaaaaaaaaaaaaaaaa", ".pñg"] {
            assert!(
                matches!(validate_extension(bad), Err(StoreError::InvalidExtension(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_upload_from_filename() {
        let upload = Upload::from_filename(vec![1, 2, 3], "me.gif");
        assert_eq!(upload.extension, ".gif");
        assert!(!upload.is_empty());
        assert!(Upload::new(Vec::new(), ".gif").is_empty());
    }
}
