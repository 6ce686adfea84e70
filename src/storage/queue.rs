use anyhow::Result;

use super::schema::Store;
use super::types::{QueueRecord, QueueRow};
use crate::feed::FeedItem;

/// Alt text stored with every image; older databases expect the column set.
const IMAGE_TITLE: &str = "image";

const RECORD_COLUMNS: &str =
    "guid, feed_id, title, link, image, hashtags, body, summary, timestamp, posted";

impl Store {
    // ========================================================================
    // Queue Mutations
    // ========================================================================

    /// Queue an item unless its guid is already known, returns whether it
    /// was inserted
    ///
    /// Existing rows are never modified, so re-fetching a feed cannot
    /// duplicate an item or alter one that is queued or already posted.
    pub async fn insert_if_absent(&self, feed_id: &str, item: &FeedItem) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO feeds
                (guid, feed_id, title, body, summary, link, image, image_title, hashtags, posted, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
        "#,
        )
        .bind(&item.guid)
        .bind(feed_id)
        .bind(&item.title)
        .bind(&item.body)
        .bind(&item.summary)
        .bind(&item.link)
        .bind(&item.image)
        .bind(IMAGE_TITLE)
        .bind(item.tags.to_hashtag_line())
        .bind(item.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark an item as posted (idempotent), returns whether it was changed
    pub async fn mark_posted(&self, guid: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE feeds SET posted = 1 WHERE guid = ? AND IFNULL(posted, 0) = 0")
            .bind(guid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Queue Queries
    // ========================================================================

    /// Unposted items of a feed published within the last `max_age_secs`,
    /// oldest first
    ///
    /// `limit` of `None` returns every match.
    pub async fn select_pending(
        &self,
        feed_id: &str,
        max_age_secs: i64,
        limit: Option<u32>,
    ) -> Result<Vec<QueueRecord>> {
        let now = chrono::Utc::now().timestamp();
        self.select_pending_as_of(feed_id, max_age_secs, limit, now)
            .await
    }

    /// [`Store::select_pending`] against an explicit clock.
    ///
    /// Selects rows with `timestamp > now - max_age_secs`. Older rows stay
    /// in the table but are never selected again.
    pub async fn select_pending_as_of(
        &self,
        feed_id: &str,
        max_age_secs: i64,
        limit: Option<u32>,
        now: i64,
    ) -> Result<Vec<QueueRecord>> {
        let cutoff = now.saturating_sub(max_age_secs);
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(i64::from).unwrap_or(-1);

        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            r#"
            SELECT {}
            FROM feeds
            WHERE feed_id = ? AND IFNULL(posted, 0) = 0 AND timestamp > ? AND guid IS NOT NULL
            ORDER BY timestamp ASC, rowid ASC
            LIMIT ?
        "#,
            RECORD_COLUMNS
        ))
        .bind(feed_id)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            feed_id = %feed_id,
            cutoff = cutoff,
            limit = limit,
            pending = rows.len(),
            "Selected pending items"
        );

        Ok(rows.into_iter().map(QueueRow::into_record).collect())
    }

    /// Look up one queued item by guid.
    pub async fn get(&self, guid: &str) -> Result<Option<QueueRecord>> {
        let row = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {} FROM feeds WHERE guid = ?",
            RECORD_COLUMNS
        ))
        .bind(guid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(QueueRow::into_record))
    }
}
