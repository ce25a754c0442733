//! Named blob storage
//!
//! Stores uploaded file content in a flat directory. Every blob gets a
//! generated stored name of the form `{owner}_{timestamp}_{sanitized name}`,
//! e.g. `7_20240131154502123456_lecture_notes.pdf`.
//!
//! Stored names are a single path component; anything else is treated as
//! absent so no caller can address a file outside the root.

use crate::config::MAX_FILENAME_LENGTH;
use crate::database::UserId;
use crate::error::{AppError, Result};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use unicode_normalization::UnicodeNormalization;

/// How often `put` retries after losing a name to a concurrent upload
const MAX_NAME_ATTEMPTS: usize = 5;

/// Flat-directory blob store
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a new blob store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the blob store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Persist `data` under a fresh stored name and return that name.
    ///
    /// The file is synced before returning. On failure no file is left
    /// behind under the returned name.
    pub async fn put(&self, data: &[u8], original_filename: &str, owner_id: UserId) -> Result<String> {
        let safe_name = sanitize_filename(original_filename);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let timestamp = Utc::now().format("%Y%m%d%H%M%S%6f");
            let stored_name = format!("{}_{}_{}", owner_id, timestamp, safe_name);
            let path = self.root.join(&stored_name);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("Stored name taken, retrying: {}", stored_name);
                    tokio::task::yield_now().await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let written = async {
                file.write_all(data).await?;
                file.sync_all().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove partial blob {}: {}", stored_name, cleanup);
                }
                return Err(e.into());
            }

            tracing::debug!("Wrote blob: {} ({} bytes)", stored_name, data.len());
            return Ok(stored_name);
        }

        Err(AppError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "could not allocate a unique stored name",
        )))
    }

    /// Read a blob back
    pub async fn get(&self, stored_name: &str) -> Result<Vec<u8>> {
        let path = self
            .get_path(stored_name)
            .ok_or_else(|| AppError::BlobNotFound(stored_name.to_string()))?;

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::BlobNotFound(stored_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Read blob: {} ({} bytes)", stored_name, data.len());

        Ok(data)
    }

    /// Check if a blob exists
    pub async fn exists(&self, stored_name: &str) -> Result<bool> {
        match self.get_path(stored_name) {
            Some(path) => Ok(fs::try_exists(path).await?),
            None => Ok(false),
        }
    }

    /// Delete a blob. Deleting an absent blob succeeds.
    pub async fn delete(&self, stored_name: &str) -> Result<()> {
        let Some(path) = self.get_path(stored_name) else {
            return Ok(());
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted blob: {}", stored_name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a stored name to its path, refusing anything that is not a
    /// single plain file name
    fn get_path(&self, stored_name: &str) -> Option<PathBuf> {
        let valid = !stored_name.is_empty()
            && stored_name != "."
            && stored_name != ".."
            && !stored_name.contains(|c: char| matches!(c, '/' | '\\' | '\0'));

        valid.then(|| self.root.join(stored_name))
    }

    /// Get blob store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reduce a user-supplied filename to `[A-Za-z0-9._-]`.
///
/// Accented letters are NFKD-folded to their ASCII base, path separators and
/// whitespace become `_`, other characters are dropped. The stem is trimmed of
/// leading and trailing `.`/`_` and falls back to `file`, while an
/// alphanumeric extension is kept, so `.pdf` becomes `file.pdf`. Long names
/// are cut from the end of the stem so the extension survives.
pub fn sanitize_filename(filename: &str) -> String {
    let mut cleaned = String::with_capacity(filename.len());
    let mut pending_gap = false;

    for c in filename.nfkd() {
        if c == '/' || c == '\\' || c.is_whitespace() {
            pending_gap = true;
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            if pending_gap && !cleaned.is_empty() {
                cleaned.push('_');
            }
            pending_gap = false;
            cleaned.push(c);
        }
    }

    let (stem, ext) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            (stem, Some(ext))
        }
        _ => (cleaned.as_str(), None),
    };

    let stem = stem.trim_matches(|c: char| c == '.' || c == '_');
    let stem = if stem.is_empty() { "file" } else { stem };

    // ASCII only from here, so byte slicing is safe
    let Some(ext) = ext else {
        return stem[..stem.len().min(MAX_FILENAME_LENGTH)].to_string();
    };

    if ext.len() >= MAX_FILENAME_LENGTH / 2 {
        let whole = format!("{}.{}", stem, ext);
        return whole[..whole.len().min(MAX_FILENAME_LENGTH)].to_string();
    }

    let keep = MAX_FILENAME_LENGTH - ext.len() - 1;
    format!("{}.{}", &stem[..stem.len().min(keep)], ext)
}
