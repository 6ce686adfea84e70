/// Canonicalizes a free-text label into a hashtag.
///
/// Lowercases, drops whitespace and any existing `#`, then prefixes a
/// single `#`. `"Tech News"` and `"#tech news"` both become `"#technews"`.
pub fn sanitize(tag: &str) -> String {
    let body: String = tag
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '#')
        .collect();
    format!("#{}", body)
}

/// Insertion-ordered set of sanitized hashtags.
///
/// Every mutation sanitizes its input first, so membership is effectively
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds each tag unless it sanitizes to a bare `#` or is already present.
    pub fn add<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = sanitize(tag.as_ref());
            if tag.len() > 1 && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }

    /// Removes each tag after sanitizing it.
    pub fn remove<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = sanitize(tag.as_ref());
            self.tags.retain(|t| *t != tag);
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        let tag = sanitize(tag);
        self.tags.contains(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Space-joined form, as posted and as stored in the `hashtags` column.
    pub fn to_hashtag_line(&self) -> String {
        self.tags.join(" ")
    }

    /// Inverse of [`TagSet::to_hashtag_line`].
    pub fn from_hashtag_line(line: &str) -> Self {
        let mut set = Self::new();
        set.add(line.split_whitespace());
        set
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.add(iter);
        set
    }
}
