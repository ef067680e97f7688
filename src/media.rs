use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::errors::ServiceError;

/// Filesystem-backed image storage.
///
/// Files are addressed by a relative path under the media root, mirroring
/// the storefront's upload layout: `products/` for main images,
/// `products/additional/` for gallery images, `categories/` for category
/// images.
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes `bytes` under the media root and returns the relative path
    /// that was stored.
    pub async fn save(&self, relative: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        let relative = relative.trim_start_matches('/');
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::InternalError(format!("media dir create: {e}")))?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| ServiceError::InternalError(format!("media write: {e}")))?;
        debug!(path = %path.display(), size = bytes.len(), "stored media file");
        Ok(relative.to_string())
    }

    pub fn absolute_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Strips characters that are unsafe in a stored filename.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
