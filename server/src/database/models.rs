//! Database models
//!
//! Rust structs representing database rows.
//! Models use serde for the JSON responses of the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i64;
pub type NoteId = i64;

/// A registered account
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Lower-cased login key
    pub email: String,
    /// PHC-format Argon2 hash; never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub joined_at: DateTime<Utc>,
}

/// Metadata for one uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: NoteId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    /// Sanitized name the uploader gave the file
    pub original_filename: String,
    /// Name of the backing blob in the blob store
    pub stored_filename: String,
    pub upload_date: DateTime<Utc>,
    pub download_count: i64,
}

/// Insert payload for a note row
#[derive(Debug)]
pub struct NewNote<'a> {
    pub user_id: UserId,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub category: &'a str,
    pub original_filename: &'a str,
    pub stored_filename: &'a str,
}

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest upload first
    #[default]
    Recent,
    /// Most downloads first, newest upload breaking ties
    Popular,
}

impl SortOrder {
    /// `"popular"` selects `Popular`; anything else falls back to `Recent`.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("popular") {
            SortOrder::Popular
        } else {
            SortOrder::Recent
        }
    }
}

/// Listing filter; `None` means "do not filter"
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub text: Option<String>,
    pub category: Option<String>,
}
