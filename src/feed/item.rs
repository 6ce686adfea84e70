use super::tags::TagSet;

/// Normalized feed entry, ready to be queued and posted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub guid: String,
    pub title: String,
    pub link: String,
    /// Cover image URL.
    pub image: Option<String>,
    /// Markdown of the first content block.
    pub body: Option<String>,
    /// Markdown of the entry summary.
    pub summary: Option<String>,
    pub tags: TagSet,
    /// Epoch seconds: publish time, or ingestion time when the feed has none.
    pub timestamp: i64,
}
