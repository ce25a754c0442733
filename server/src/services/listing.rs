//! Listing service
//!
//! Browsing and search over the note catalog. Results are always capped
//! at `LISTING_LIMIT`.

use crate::config::LISTING_LIMIT;
use crate::database::{Note, NoteFilter, Repository, SortOrder};
use crate::error::Result;

#[derive(Clone)]
pub struct ListingService {
    repo: Repository,
}

impl ListingService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// List notes matching `filter` in `sort` order.
    ///
    /// Blank filter values are ignored. An unknown category is not an
    /// error; it simply matches nothing. `limit` is clamped to
    /// `LISTING_LIMIT`.
    pub async fn list(&self, filter: NoteFilter, sort: SortOrder, limit: usize) -> Result<Vec<Note>> {
        let filter = NoteFilter {
            text: non_blank(filter.text),
            category: non_blank(filter.category),
        };
        let limit = i64::try_from(limit).unwrap_or(LISTING_LIMIT).min(LISTING_LIMIT);

        tracing::debug!(?filter, ?sort, limit, "Listing notes");

        self.repo.list_notes(&filter, sort, limit).await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
