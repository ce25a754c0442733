//! Note catalog service
//!
//! Owns the note lifecycle: validation, creation (blob first, then
//! metadata), downloads and deletion (blob first, then metadata).
//! Integrates Repository and BlobStore.

use crate::config::CatalogRules;
use crate::database::{NewNote, Note, NoteId, Repository, UserId};
use crate::error::{AppError, Result};
use crate::storage::{sanitize_filename, BlobStore};
use std::sync::Arc;

/// A note together with the content served for it
#[derive(Debug)]
pub struct Download {
    pub note: Note,
    pub data: Vec<u8>,
}

/// Service for managing notes and their backing files
#[derive(Clone)]
pub struct NoteCatalog {
    repo: Repository,
    blob_store: BlobStore,
    rules: Arc<CatalogRules>,
}

impl NoteCatalog {
    pub fn new(repo: Repository, blob_store: BlobStore, rules: Arc<CatalogRules>) -> Self {
        Self {
            repo,
            blob_store,
            rules,
        }
    }

    /// Validate and store a new note.
    ///
    /// Nothing is written unless every check passes. The note only becomes
    /// visible once both the blob and the metadata row exist.
    pub async fn create(
        &self,
        owner_id: UserId,
        title: &str,
        description: Option<&str>,
        category: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<Note> {
        let title = title.trim();
        let category = category.trim();
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        if title.is_empty() {
            return Err(AppError::MissingField("title"));
        }
        if category.is_empty() {
            return Err(AppError::MissingField("category"));
        }
        if filename.is_empty() {
            return Err(AppError::MissingField("file"));
        }
        if !self.rules.is_category(category) {
            return Err(AppError::InvalidCategory(category.to_string()));
        }
        if !self.rules.is_allowed_filename(filename) {
            return Err(AppError::InvalidExtension(filename.to_string()));
        }

        tracing::info!(
            "Creating note: {} for user: {} (size: {} bytes)",
            title,
            owner_id,
            data.len()
        );

        let stored_filename = self.blob_store.put(data, filename, owner_id).await?;
        let original_filename = sanitize_filename(filename);

        let created = self
            .repo
            .create_note(NewNote {
                user_id: owner_id,
                title,
                description,
                category,
                original_filename: &original_filename,
                stored_filename: &stored_filename,
            })
            .await;

        match created {
            Ok(note) => {
                tracing::info!("Note created: {} ({})", note.id, note.stored_filename);
                Ok(note)
            }
            Err(e) => {
                if let Err(cleanup) = self.blob_store.delete(&stored_filename).await {
                    tracing::warn!("Failed to remove orphaned blob {}: {}", stored_filename, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Get a note by ID
    pub async fn get(&self, note_id: NoteId) -> Result<Note> {
        self.repo.get_note(note_id).await
    }

    /// Fetch a note's content and count the download.
    ///
    /// A note whose blob has vanished fails with `BrokenReference` and is
    /// not counted.
    pub async fn record_download(&self, note_id: NoteId) -> Result<Download> {
        let note = self.repo.get_note(note_id).await?;

        let data = match self.blob_store.get(&note.stored_filename).await {
            Ok(data) => data,
            Err(AppError::BlobNotFound(name)) => {
                tracing::warn!("Note {} references missing blob {}", note_id, name);
                return Err(AppError::BrokenReference(note_id));
            }
            Err(e) => return Err(e),
        };

        self.repo.increment_download_count(note_id).await?;

        tracing::debug!("Recorded download of note: {}", note_id);

        Ok(Download { note, data })
    }

    /// Delete a note on behalf of its owner.
    ///
    /// The blob goes first and failures there are only logged; the
    /// metadata row is removed regardless.
    pub async fn delete(&self, note_id: NoteId, requester_id: UserId) -> Result<()> {
        let note = self.repo.get_note(note_id).await?;

        if note.user_id != requester_id {
            tracing::warn!(
                "User {} attempted to delete note {} owned by {}",
                requester_id,
                note_id,
                note.user_id
            );
            return Err(AppError::Forbidden);
        }

        tracing::info!("Deleting note: {}", note_id);

        if let Err(e) = self.blob_store.delete(&note.stored_filename).await {
            tracing::warn!(
                "Failed to delete blob {} for note {}: {}",
                note.stored_filename,
                note_id,
                e
            );
        }

        self.repo.delete_note(note_id).await?;

        tracing::info!("Note deleted: {}", note_id);

        Ok(())
    }

    /// Notes owned by one user, newest first
    pub async fn notes_owned_by(&self, user_id: UserId) -> Result<Vec<Note>> {
        self.repo.list_notes_by_owner(user_id).await
    }

    pub fn rules(&self) -> &CatalogRules {
        &self.rules
    }

    pub fn blob_store(&self) -> &BlobStore {
        &self.blob_store
    }
}
