use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_message, StoreError};

/// Columns added after the first on-disk format. Older databases get them
/// through `ALTER TABLE ... ADD COLUMN` when opened.
const ADDED_COLUMNS: &[(&str, &str)] = &[
    ("summary", "VARCHAR(2048)"),
    ("image_title", "VARCHAR(255)"),
];

// ============================================================================
// Store
// ============================================================================

/// The durable queue: one SQLite table of feed items keyed by guid.
#[derive(Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Locked` if another process keeps the database
    /// busy past the 5 second busy timeout.
    /// Returns `StoreError::Migration` if the schema cannot be created or
    /// upgraded.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: wait up to 5 seconds for a stray second process
        // to release its lock before returning SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StoreError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        // Single writer, single connection. Also keeps `:memory:` databases
        // alive for the lifetime of the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StoreError::from_sqlx)?;
        let store = Self { pool };
        store.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                StoreError::Locked
            } else {
                StoreError::Migration(e.to_string())
            }
        })?;
        Ok(store)
    }

    /// Close the pool, flushing the connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create the queue table, or add columns missing from an older one.
    ///
    /// Upgrades are additive only; existing columns and rows are never
    /// touched.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                guid VARCHAR(255) PRIMARY KEY,
                feed_id VARCHAR(127),
                title VARCHAR(255),
                link VARCHAR(255),
                image VARCHAR(255),
                image_title VARCHAR(255),
                hashtags VARCHAR(255),
                timestamp INTEGER(10),
                posted INTEGER(1),
                body VARCHAR(10240),
                summary VARCHAR(2048)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        let existing: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info('feeds')")
            .fetch_all(&mut *tx)
            .await?;

        for (column, decl) in ADDED_COLUMNS {
            if existing.iter().any(|(name,)| name.eq_ignore_ascii_case(column)) {
                continue;
            }
            tracing::info!(column = %column, "Upgrading database schema: adding column");
            sqlx::query(&format!("ALTER TABLE feeds ADD COLUMN {} {}", column, decl))
                .execute(&mut *tx)
                .await?;
        }

        // Narrows the pending-selection query to one feed
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feeds_pending ON feeds(feed_id, posted, timestamp)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
