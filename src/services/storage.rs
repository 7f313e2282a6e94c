//! Photo upload storage
//!
//! Uploaded photos live under `{uploads.dir}/{content_id}/{uuid}.{ext}` and
//! are served read-only under `/uploads`. The extension is derived from the
//! MIME type so client file names never reach the filesystem.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use axum::body::Bytes;
use axum::extract::Multipart;
use tracing::{debug, warn};
use uuid::Uuid;
use crate::config::UploadConfig;
use crate::models::content::NewPhoto;
use crate::utils::errors::{PortalError, Result};
use crate::utils::helpers::{format_bytes, truncate_text};

/// Multipart field that carries photo files
pub const PHOTO_FIELD: &str = "photos";

/// A file part read from a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: Option<String>,
    pub mime_type: String,
    pub data: Bytes,
}

/// Text fields and photo files of one multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// File extension stored for an accepted MIME type
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Keep only the final path component of a client-supplied name
fn clean_original_name(name: &str) -> Option<String> {
    let base = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name).trim();
    (!base.is_empty()).then(|| truncate_text(base, 200))
}

#[derive(Debug, Clone)]
pub struct StorageService {
    config: UploadConfig,
}

impl StorageService {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        Path::new(&self.config.dir)
    }

    fn content_dir(&self, content_id: i64) -> PathBuf {
        self.root().join(content_id.to_string())
    }

    /// Read every part of a multipart form, enforcing the upload limits
    pub async fn read_form(&self, mut multipart: Multipart) -> Result<MultipartForm> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == PHOTO_FIELD {
                if form.files.len() >= self.config.max_files_per_upload {
                    return Err(PortalError::InvalidInput(format!(
                        "at most {} photos per upload",
                        self.config.max_files_per_upload
                    )));
                }

                let original_name = field.file_name().and_then(clean_original_name);
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_ascii_lowercase();
                let data = field.bytes().await?;

                let file = UploadedFile { original_name, mime_type, data };
                self.validate_file(&file)?;
                form.files.push(file);
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        debug!(fields = form.fields.len(), files = form.files.len(), "Multipart form read");
        Ok(form)
    }

    /// Check type and size of a single file
    pub fn validate_file(&self, file: &UploadedFile) -> Result<()> {
        if !self.config.allowed_mime_types.iter().any(|m| m == &file.mime_type)
            || extension_for(&file.mime_type).is_none()
        {
            return Err(PortalError::InvalidInput(format!(
                "unsupported file type {}",
                file.mime_type
            )));
        }

        if file.data.is_empty() {
            return Err(PortalError::InvalidInput("empty file".to_string()));
        }

        if file.data.len() > self.config.max_file_bytes {
            return Err(PortalError::PayloadTooLarge(format!(
                "{} exceeds the {} limit",
                file.original_name.as_deref().unwrap_or("file"),
                format_bytes(self.config.max_file_bytes as u64)
            )));
        }

        Ok(())
    }

    /// Write files for a content row, returning their metadata. Files already
    /// written are removed again if a later write fails.
    pub async fn save(&self, content_id: i64, files: &[UploadedFile]) -> Result<Vec<NewPhoto>> {
        let dir = self.content_dir(content_id);
        tokio::fs::create_dir_all(&dir).await?;

        let mut saved: Vec<NewPhoto> = Vec::with_capacity(files.len());
        for file in files {
            self.validate_file(file)?;
            let ext = extension_for(&file.mime_type).unwrap_or("bin");
            let file_name = format!("{}.{}", Uuid::new_v4(), ext);

            if let Err(e) = tokio::fs::write(dir.join(&file_name), &file.data).await {
                for photo in &saved {
                    self.remove_file(content_id, &photo.file_name).await;
                }
                return Err(e.into());
            }

            saved.push(NewPhoto {
                file_name,
                original_name: file.original_name.clone(),
                mime_type: file.mime_type.clone(),
                size_bytes: file.data.len() as i64,
            });
        }

        debug!(content_id = content_id, count = saved.len(), "Photos stored");
        Ok(saved)
    }

    /// Remove one stored file; a missing file is not an error
    pub async fn remove_file(&self, content_id: i64, file_name: &str) {
        let path = self.content_dir(content_id).join(file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Photo file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove photo file"),
        }
    }

    /// Remove every stored file of a content row
    pub async fn remove_content(&self, content_id: i64) {
        let dir = self.content_dir(content_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(path = %dir.display(), "Content upload directory removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %dir.display(), error = %e, "Failed to remove upload directory"),
        }
    }
}
