use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use super::staging::StagedFile;
use crate::shared::AppError;

/// Text fields and staged files read from a multipart body.
/// At most one file is kept per field name.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, StagedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }

    /// Removes every staged file still owned by the form
    pub async fn discard_files(&mut self) {
        for (_, file) in self.files.drain() {
            file.discard().await;
        }
    }
}

/// Reads the whole multipart body, staging file parts under `temp_dir`.
/// File parts without a file name or content are treated as absent.
pub async fn read_multipart(
    mut multipart: Multipart,
    temp_dir: &Path,
) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    if let Err(e) = read_parts(&mut multipart, temp_dir, &mut form).await {
        form.discard_files().await;
        return Err(e);
    }

    debug!(
        fields = form.fields.len(),
        files = form.files.len(),
        "Read multipart form"
    );
    Ok(form)
}

async fn read_parts(
    multipart: &mut Multipart,
    temp_dir: &Path,
    form: &mut MultipartForm,
) -> Result<(), AppError> {
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        warn!(error = %e, "Malformed multipart body");
        AppError::validation(format!("Invalid multipart body: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                if file_name.is_empty() || data.is_empty() || form.files.contains_key(&name) {
                    continue;
                }
                let staged =
                    StagedFile::write(temp_dir, Some(file_name), content_type, &data).await?;
                form.files.insert(name, staged);
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(())
}
