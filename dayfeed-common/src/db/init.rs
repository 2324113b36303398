//! Database initialization
//!
//! Opens (or creates) the SQLite file under the root folder and creates
//! any missing tables. Every statement is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// File name of the database inside the root folder
pub const DATABASE_FILE_NAME: &str = "dayfeed.db";

/// Open the database file, creating it and its folder on first run
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection settings: WAL so feed reads never wait on an
    // acknowledgment write, busy timeout for concurrent confirmations
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Created database: {}", db_path.display());
    } else {
        info!("Opened database: {}", db_path.display());
    }

    ensure_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// The pool is pinned to a single connection that never expires, since
/// every new SQLite memory connection would otherwise see an empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    ensure_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index the service uses
///
/// Safe to run on every start; existing tables are left as they are.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    create_content_items_table(pool).await?;
    create_acknowledgments_table(pool).await?;
    Ok(())
}

/// Create the primary content store table
///
/// One row per rotation-eligible item. `position` preserves the curator's
/// ordering so rotation indexes stay stable while new items are appended.
pub async fn create_content_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_items (
            guid TEXT PRIMARY KEY,
            client_id TEXT NOT NULL,
            category TEXT NOT NULL CHECK (category IN ('photo', 'greeting', 'activity')),
            payload TEXT NOT NULL,
            caption TEXT NOT NULL DEFAULT '',
            weather_affinity TEXT NOT NULL DEFAULT 'any',
            time_of_day TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_content_items_client_category
         ON content_items (client_id, category, position)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the acknowledgment ledger table
///
/// The UNIQUE constraint is the idempotency key: a second insert for the
/// same day/client/task/slot/description is a no-op at the storage level.
/// Clients sharing a reminder text are tracked independently.
pub async fn create_acknowledgments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS acknowledgments (
            guid TEXT PRIMARY KEY,
            ack_date TEXT NOT NULL,
            task_type TEXT NOT NULL,
            time_slot TEXT NOT NULL,
            description TEXT NOT NULL,
            client_id TEXT NOT NULL,
            acked_at TIMESTAMP NOT NULL,
            UNIQUE (ack_date, client_id, task_type, time_slot, description)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_acknowledgments_date_client
         ON acknowledgments (ack_date, client_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_memory_database_has_all_tables() {
        let pool = init_memory_database().await.unwrap();
        let tables = table_names(&pool).await;

        for expected in ["acknowledgments", "content_items"] {
            assert!(tables.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[tokio::test]
    async fn test_file_database_created_and_reopened() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join(DATABASE_FILE_NAME);

        let pool = init_database(&db_path).await.unwrap();
        assert!(db_path.exists());
        pool.close().await;

        // Second open runs the same idempotent schema creation
        let pool = init_database(&db_path).await.unwrap();
        assert_eq!(table_names(&pool).await.len(), 2);
    }

    #[tokio::test]
    async fn test_file_database_uses_wal() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join(DATABASE_FILE_NAME))
            .await
            .unwrap();

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }
}
