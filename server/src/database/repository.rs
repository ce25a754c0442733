//! Repository layer for database operations
//!
//! Row-level reads and writes for users and notes. Every write here is a
//! single statement, so SQLite's row atomicity is the only coordination
//! the callers rely on.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user row. The email must already be normalized.
    pub async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, joined_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::DuplicateEmail,
            other => AppError::Database(other),
        })?;

        tracing::debug!("Created user: {}", user.id);
        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Delete a user row. Fails on the foreign key if the user still owns notes.
    pub async fn delete_user(&self, id: UserId) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!("Deleted user: {} (rows: {})", id, rows);
        Ok(rows > 0)
    }

    /// Insert a note row with a zero download count
    pub async fn create_note(&self, new: NewNote<'_>) -> Result<Note> {
        let now = Utc::now();

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes
                (user_id, title, description, category, original_filename, stored_filename, upload_date, download_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.category)
        .bind(new.original_filename)
        .bind(new.stored_filename)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created note: {} ({})", note.id, note.stored_filename);
        Ok(note)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: NoteId) -> Result<Note> {
        sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound(id))
    }

    pub async fn increment_download_count(&self, id: NoteId) -> Result<()> {
        let rows = sqlx::query("UPDATE notes SET download_count = download_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(id));
        }

        Ok(())
    }

    /// Permanently delete a note row
    pub async fn delete_note(&self, id: NoteId) -> Result<()> {
        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(id));
        }

        tracing::debug!("Deleted note row: {}", id);
        Ok(())
    }

    /// Filtered, ordered and capped listing of the whole catalog
    pub async fn list_notes(&self, filter: &NoteFilter, sort: SortOrder, limit: i64) -> Result<Vec<Note>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM notes WHERE 1 = 1");

        if let Some(text) = &filter.text {
            let pattern = format!("%{}%", escape_like(text));
            query
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR description LIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\')");
        }

        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category.clone());
        }

        query.push(match sort {
            SortOrder::Recent => " ORDER BY upload_date DESC, id DESC",
            SortOrder::Popular => " ORDER BY download_count DESC, upload_date DESC, id DESC",
        });
        query.push(" LIMIT ").push_bind(limit);

        let notes = query.build_query_as::<Note>().fetch_all(&self.pool).await?;

        Ok(notes)
    }

    /// Notes owned by one user, newest first
    pub async fn list_notes_by_owner(&self, user_id: UserId) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT * FROM notes WHERE user_id = ? ORDER BY upload_date DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    #[cfg(test)]
    pub async fn count_notes(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Escape LIKE wildcards so user text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
