//! Uploaded files under the media root.

use std::path::{Path, PathBuf};

use cryptodash_core::{
    Error,
    error::{StorageError, ValidationError},
};

pub const AVATAR_DIR: &str = "avatars";
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Files live at `{root}/{relative path}` and are served under `/media/`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an avatar under a generated name, keeping the original extension.
    /// Returns the path relative to the media root.
    pub async fn save_avatar(&self, original_name: Option<&str>, data: &[u8]) -> Result<String, Error> {
        if data.is_empty() {
            return Err(ValidationError::NoFileUploaded.into());
        }
        if data.len() > MAX_AVATAR_BYTES {
            return Err(ValidationError::InvalidField(format!(
                "avatar: File too large. Maximum size is {} MB.",
                MAX_AVATAR_BYTES / (1024 * 1024)
            ))
            .into());
        }

        let dir = self.root.join(AVATAR_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| file_error("Failed to create avatar directory", e))?;

        let file_name = match original_name.and_then(extension) {
            Some(ext) => format!("{}.{ext}", uuid::Uuid::new_v4().simple()),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };
        tokio::fs::write(dir.join(&file_name), data)
            .await
            .map_err(|e| file_error("Failed to write avatar", e))?;

        let relative = format!("{AVATAR_DIR}/{file_name}");
        tracing::debug!(path = %relative, bytes = data.len(), "Stored avatar");
        Ok(relative)
    }

    /// Best-effort removal of a previously stored file.
    pub async fn remove(&self, relative: &str) {
        if relative.split('/').any(|part| part == ".." || part.is_empty()) {
            tracing::warn!(path = %relative, "Refusing to remove suspicious media path");
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
            tracing::warn!(path = %relative, error = %e, "Failed to remove media file");
        }
    }
}

/// Absolute URL of a stored file for a client that reached us at `base_url`.
pub fn media_url(base_url: &str, relative: &str) -> String {
    format!("{}/media/{relative}", base_url.trim_end_matches('/'))
}

fn extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    (!ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| ext.to_ascii_lowercase())
}

fn file_error(context: &str, e: std::io::Error) -> Error {
    tracing::error!(error = %e, "{context}");
    Error::Storage(StorageError::File(context.to_string()))
}
