//! Uploaded photo storage.
//!
//! Photos are validated (non-empty, size cap, allowed MIME type) and
//! written under the upload directory with a random file name. The server
//! serves that directory at `/files/{name}`.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Errors that can occur while storing an uploaded photo.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The upload contained no bytes.
    #[error("uploaded image is empty")]
    Empty,

    /// The upload exceeds the configured cap.
    #[error("uploaded image is {size} bytes, the limit is {max} bytes")]
    TooLarge {
        /// Size of the upload.
        size: usize,
        /// Configured cap.
        max: usize,
    },

    /// The declared content type is not an accepted image type.
    #[error("unsupported image type: {0} (expected image/jpeg, image/png or image/webp)")]
    Unsupported(String),

    /// Writing the file failed.
    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// File extension for an accepted MIME type.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/webp" => Some(".webp"),
        _ => None,
    }
}

/// Writes uploaded photos to a directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    /// Create a store rooted at `dir` accepting at most `max_bytes` per
    /// photo.
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// Directory photos are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Configured size cap in bytes.
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create the upload directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Io`] if the directory cannot be created.
    pub async fn ensure_dir(&self) -> Result<(), ImageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Check an upload without writing it.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Empty`], [`ImageError::TooLarge`], or
    /// [`ImageError::Unsupported`].
    pub fn check(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<&'static str, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }
        let content_type = content_type.unwrap_or_default();
        extension_for(content_type).ok_or_else(|| ImageError::Unsupported(content_type.to_owned()))
    }

    /// Validate and persist an upload, returning the stored file name.
    ///
    /// # Errors
    ///
    /// Returns the [`check`](Self::check) errors, or [`ImageError::Io`] if
    /// the write fails.
    pub async fn save(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<String, ImageError> {
        let ext = self.check(content_type, bytes)?;
        let name = format!("{}{ext}", Uuid::new_v4().simple());
        self.ensure_dir().await?;
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        tracing::debug!(file = %name, size = bytes.len(), "Image stored");
        Ok(name)
    }

    /// Remove a stored photo. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Io`] for any failure other than "not found".
    pub async fn remove(&self, name: &str) -> Result<(), ImageError> {
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ImageError::Io(e)),
        }
    }
}

/// Public URL of a stored photo: `{base}/files/{name}`.
pub fn photo_url(base: &str, name: &str) -> String {
    format!("{}/files/{name}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_bytes: usize) -> (tempfile::TempDir, ImageStore) {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let store = ImageStore::new(dir.path().join("uploads"), max_bytes);
        (dir, store)
    }

    #[tokio::test]
    async fn saves_with_random_name_and_mapped_extension() {
        let (_guard, store) = store(1024);
        let Ok(name) = store.save(Some("image/png"), b"\x89PNG fake").await else {
            panic!("save failed");
        };

        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 32 + ".png".len());
        let written = tokio::fs::read(store.dir().join(&name)).await.unwrap_or_default();
        assert_eq!(written, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn jpeg_variants_map_to_jpg() {
        let (_guard, store) = store(1024);
        for ct in ["image/jpeg", "IMAGE/JPEG; charset=binary", "image/jpg"] {
            assert!(matches!(store.check(Some(ct), b"x"), Ok(".jpg")));
        }
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let (_guard, store) = store(1024);
        assert!(matches!(store.save(Some("image/png"), b"").await, Err(ImageError::Empty)));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_before_writing() {
        let (_guard, store) = store(4);
        let result = store.save(Some("image/png"), b"12345").await;

        assert!(matches!(result, Err(ImageError::TooLarge { size: 5, max: 4 })));
        assert!(!store.dir().exists());
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected() {
        let (_guard, store) = store(1024);
        assert!(matches!(
            store.save(Some("image/gif"), b"GIF89a").await,
            Err(ImageError::Unsupported(_))
        ));
        assert!(matches!(store.save(None, b"data").await, Err(ImageError::Unsupported(_))));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_guard, store) = store(1024);
        let Ok(name) = store.save(Some("image/webp"), b"RIFF").await else {
            panic!("save failed");
        };
        assert!(store.remove(&name).await.is_ok());
        assert!(store.remove(&name).await.is_ok());
    }

    #[test]
    fn photo_url_joins_base_and_name() {
        assert_eq!(photo_url("http://localhost:8000/", "a.jpg"), "http://localhost:8000/files/a.jpg");
    }
}
