/// A text block as declared by the feed: its MIME type and raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub media_type: String,
    pub value: String,
}

impl TextBlock {
    pub fn new(media_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            value: value.into(),
        }
    }

    /// Whether the block must go through HTML-to-Markdown conversion.
    pub fn is_html(&self) -> bool {
        let essence = self
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        essence.eq_ignore_ascii_case("text/html")
            || essence.eq_ignore_ascii_case("application/xhtml+xml")
    }
}

/// A link attached to an entry, with its declared MIME type if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedLink {
    pub href: String,
    pub media_type: Option<String>,
}

/// One feed entry with every field the extractor may look at.
///
/// Built once at the parser boundary; nothing downstream touches the
/// feed library's model types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Entry id (RSS `guid`, Atom `id`).
    pub id: Option<String>,
    pub title: Option<String>,
    /// Primary (alternate) link of the entry.
    pub link: Option<String>,
    /// Publish time in epoch seconds.
    pub published: Option<i64>,
    /// Content blocks in document order. Only the first one is used.
    pub content: Vec<TextBlock>,
    pub summary: Option<TextBlock>,
    /// URLs from `media:content` (and enclosures) in document order.
    pub media_urls: Vec<String>,
    pub links: Vec<TypedLink>,
    /// Raw category terms.
    pub categories: Vec<String>,
}
