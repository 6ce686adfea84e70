use serde::Deserialize;

use crate::feed::FeedItem;

/// Footer appended to posts unless branding is disabled.
pub const DEFAULT_BRANDING: &str = "posted by pod-feeder";

/// Alt text of embedded images.
const IMAGE_ALT: &str = "image";

/// Which text block, if any, follows the title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    #[default]
    None,
    Body,
    Summary,
}

/// How a post is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub content: ContentMode,
    pub embed_image: bool,
    /// Put the bare link under the title instead of linking the title.
    pub post_raw_link: bool,
    /// Footer line; `None` disables branding.
    pub branding: Option<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            content: ContentMode::None,
            embed_image: false,
            post_raw_link: false,
            branding: Some(DEFAULT_BRANDING.to_string()),
        }
    }
}

/// Builds the Markdown message for an item.
///
/// Layout, each part separated as shown:
///
/// ```text
/// ### [title](link)\n\n      (or "### title\n\nlink\n\n")
/// ![image](url)\n\n          (embed_image and an image exists)
/// body or summary\n\n        (per ContentMode, skipped when empty)
/// #tag1 #tag2\n              (skipped without tags)
/// branding                   (unless disabled)
/// ```
pub fn format_message(item: &FeedItem, options: &FormatOptions) -> String {
    let mut output = if options.post_raw_link {
        format!("### {}\n\n{}\n\n", item.title, item.link)
    } else {
        format!("### [{}]({})\n\n", item.title, item.link)
    };

    if options.embed_image {
        if let Some(image) = &item.image {
            output.push_str(&format!("![{}]({})\n\n", IMAGE_ALT, image));
        }
    }

    let block = match options.content {
        ContentMode::None => None,
        ContentMode::Body => item.body.as_deref(),
        ContentMode::Summary => item.summary.as_deref(),
    };
    if let Some(text) = block.filter(|t| !t.trim().is_empty()) {
        output.push_str(text);
        output.push_str("\n\n");
    }

    if !item.tags.is_empty() {
        output.push_str(&item.tags.to_hashtag_line());
        output.push('\n');
    }

    if let Some(branding) = &options.branding {
        output.push_str(branding);
    }

    output
}
