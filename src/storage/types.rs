use thiserror::Error;

use crate::feed::{FeedItem, TagSet};

// ============================================================================
// Error Types
// ============================================================================

/// Store-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another process holds the database
    #[error("Another pod-feeder process appears to be using the database. Try again later.")]
    Locked,

    /// Schema creation or upgrade failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps lock-related sqlx errors to [`StoreError::Locked`].
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return StoreError::Locked;
        }
        StoreError::Other(err)
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6) surface through these messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
}

// ============================================================================
// Records
// ============================================================================

/// A queued feed item and its publish state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    /// Operator-assigned feed grouping key.
    pub feed_id: String,
    pub posted: bool,
    pub item: FeedItem,
}

/// Row shape of the `feeds` table.
///
/// Text columns are nullable because rows written by older releases may
/// hold NULLs.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QueueRow {
    pub guid: String,
    pub feed_id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub hashtags: Option<String>,
    pub body: Option<String>,
    pub summary: Option<String>,
    pub timestamp: Option<i64>,
    pub posted: Option<bool>,
}

impl QueueRow {
    pub(crate) fn into_record(self) -> QueueRecord {
        QueueRecord {
            feed_id: self.feed_id.unwrap_or_default(),
            posted: self.posted.unwrap_or(false),
            item: FeedItem {
                guid: self.guid,
                title: self.title.unwrap_or_default(),
                link: self.link.unwrap_or_default(),
                image: self.image.filter(|s| !s.is_empty()),
                body: self.body,
                summary: self.summary,
                tags: TagSet::from_hashtag_line(self.hashtags.as_deref().unwrap_or_default()),
                timestamp: self.timestamp.unwrap_or_default(),
            },
        }
    }
}
