//! Schema migrations
//!
//! Migrations are embedded SQL files, applied in version order. Each runs in
//! its own transaction together with its `schema_migrations` row and an
//! ownership check, so a migration either lands whole or not at all.
//! Connection settings (WAL, foreign keys) belong to the pool options.

use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::sqlite::SqlitePool;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: include_str!("migrations/001_initial_schema.sql"),
}];

/// Bring the schema up to date. Returns how many migrations were applied.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await?;

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect();

    if pending.is_empty() {
        tracing::debug!("Schema up to date at version {}", applied.len());
        return Ok(0);
    }

    for migration in &pending {
        apply_migration(pool, migration).await?;
    }

    Ok(pending.len())
}

async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    tracing::info!(
        "Applying migration {} ({})",
        migration.version,
        migration.name
    );

    let failed = |reason: String| AppError::Migration {
        version: migration.version,
        reason,
    };

    let mut tx = pool.begin().await?;

    sqlx::raw_sql(migration.sql)
        .execute(&mut *tx)
        .await
        .map_err(|e| failed(e.to_string()))?;

    // Every note must still belong to an existing user
    let violations = sqlx::query("PRAGMA foreign_key_check")
        .fetch_all(&mut *tx)
        .await?
        .len();
    if violations > 0 {
        return Err(failed(format!(
            "{} rows reference missing users",
            violations
        )));
    }

    sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}
