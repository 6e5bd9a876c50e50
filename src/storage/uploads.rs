//! Shared upload directory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use uuid::Uuid;

const MAX_NAME_CHARS: usize = 64;

/// Temp file write/delete failure. Logged only; never reaches the client.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to create upload directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write upload {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to delete {path}: {source}")]
    Delete { path: PathBuf, source: io::Error },

    #[error("failed to list {path}: {source}")]
    List { path: PathBuf, source: io::Error },

    #[error("failed to stat {path}: {source}")]
    Stat { path: PathBuf, source: io::Error },
}

/// An uploaded image stored on disk. Its creation time lives in filesystem
/// metadata; no separate record is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFile {
    pub path: PathBuf,
}

/// Writes client uploads into the shared directory under collision-resistant
/// names.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), FileError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| FileError::CreateDir {
                path: self.dir.clone(),
                source,
            })
    }

    /// Persist an upload as `<unix millis>-<random>-<sanitized name>`.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<TempFile, FileError> {
        let path = self.dir.join(stored_name(original_name, SystemTime::now()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| FileError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Upload stored");
        Ok(TempFile { path })
    }
}

/// Delete an upload. Returns `false` when it was already gone.
pub async fn remove(path: &Path) -> Result<bool, FileError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(FileError::Delete {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn stored_name(original_name: &str, now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let nonce = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", millis, &nonce[..8], sanitize_name(original_name))
}

/// Keep `[A-Za-z0-9._-]`, drop any directory part, cap the length.
pub fn sanitize_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');

    // Keep the extension when truncating.
    let name = if trimmed.chars().count() > MAX_NAME_CHARS {
        match trimmed.rsplit_once('.') {
            Some((stem, ext)) if ext.len() < MAX_NAME_CHARS / 2 => {
                let keep = MAX_NAME_CHARS - ext.len() - 1;
                format!("{}.{}", &stem[..keep.min(stem.len())], ext)
            }
            _ => trimmed[..MAX_NAME_CHARS].to_string(),
        }
    } else {
        trimmed.to_string()
    };

    if name.is_empty() {
        "upload".to_string()
    } else {
        name
    }
}
