use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::shared::AppError;

/// An uploaded file written to the temp directory, waiting to go to the media host
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
}

impl StagedFile {
    /// Writes `data` under `dir`, keeping the original file extension
    pub async fn write(
        dir: &Path,
        original_name: Option<String>,
        content_type: Option<String>,
        data: &[u8],
    ) -> Result<Self, AppError> {
        let io_error = |e: std::io::Error| {
            warn!(error = %e, dir = %dir.display(), "Failed to stage upload");
            AppError::Internal("Failed to store uploaded file".to_string())
        };

        tokio::fs::create_dir_all(dir).await.map_err(io_error)?;

        let extension = original_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));
        let name = match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let path = dir.join(name);

        tokio::fs::write(&path, data).await.map_err(io_error)?;
        debug!(path = %path.display(), bytes = data.len(), "Staged upload");

        Ok(Self {
            path,
            original_name,
            content_type,
        })
    }

    /// Removes the staged file. A file that is already gone is not an error.
    pub async fn discard(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed staged upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %self.path.display(), "Failed to remove staged upload"),
        }
    }
}
