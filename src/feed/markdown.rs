use super::entry::TextBlock;

/// Line width handed to the HTML renderer. Wide enough that ordinary
/// paragraphs are not reflowed.
const RENDER_WIDTH: usize = 1000;

/// Converts an HTML fragment to Markdown-style text.
pub fn html_to_markdown(html: &str) -> String {
    html2text::from_read(html.as_bytes(), RENDER_WIDTH)
}

/// Renders a declared text block, converting only when it is HTML.
///
/// The result is trimmed; whitespace-only output becomes `None`.
pub fn render_block(block: &TextBlock) -> Option<String> {
    let text = if block.is_html() {
        html_to_markdown(&block.value)
    } else {
        block.value.clone()
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
