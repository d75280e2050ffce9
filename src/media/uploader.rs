use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::shared::AppError;

/// Result of handing a local file to the media host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
}

/// A media host that takes a local file and returns a public URL for it
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia, AppError>;

    /// Deletes media previously returned by `upload`. URLs the host does not
    /// own and files that are already gone are ignored.
    async fn remove(&self, url: &str) -> Result<(), AppError>;
}

/// Media host backed by a local directory that is served under `public_base_url`
pub struct LocalMediaUploader {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaUploader {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name under `root` for a URL this host produced
    fn stored_name<'a>(&self, url: &'a str) -> Option<&'a str> {
        let name = url
            .strip_prefix(self.public_base_url.trim_end_matches('/'))?
            .strip_prefix('/')?;
        let plain = !name.is_empty() && !name.contains(&['/', '\\'][..]) && name != "..";
        plain.then_some(name)
    }
}

#[async_trait]
impl MediaUploader for LocalMediaUploader {
    #[instrument(skip(self))]
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia, AppError> {
        let io_error = |e: std::io::Error| {
            warn!(error = %e, path = %local_path.display(), "Local media upload failed");
            AppError::Internal("Media upload failed".to_string())
        };

        let metadata = tokio::fs::metadata(local_path).await.map_err(io_error)?;
        if !metadata.is_file() {
            return Err(AppError::validation("Upload source is not a file"));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error)?;

        let name = match local_path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        tokio::fs::copy(local_path, self.root.join(&name))
            .await
            .map_err(io_error)?;

        let url = format!("{}/{}", self.public_base_url.trim_end_matches('/'), name);
        debug!(url = %url, "Stored media file");

        Ok(UploadedMedia { url })
    }

    #[instrument(skip(self))]
    async fn remove(&self, url: &str) -> Result<(), AppError> {
        let Some(name) = self.stored_name(url) else {
            debug!(url = %url, "Not a local media URL, nothing to remove");
            return Ok(());
        };

        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                debug!(url = %url, "Removed media file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(error = %e, url = %url, "Failed to remove media file");
                Err(AppError::Internal("Media removal failed".to_string()))
            }
        }
    }
}
