pub mod sanitize;

pub use sanitize::{escape_attribute, escape_text, sanitize_html};

use crate::constant::{ALLOWED_TAGS, DEFAULT_READ_MORE_LABEL, DEFAULT_SOURCE_LABEL, MAX_BODY_CHARS};

/// Builds the channel post for one article. Title, source and body are plain
/// text and are escaped before they are framed in markup.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    max_body_chars: usize,
    source_label: String,
    read_more_label: String,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(MAX_BODY_CHARS, DEFAULT_SOURCE_LABEL, DEFAULT_READ_MORE_LABEL)
    }
}

impl MessageFormatter {
    pub fn new(max_body_chars: usize, source_label: &str, read_more_label: &str) -> Self {
        Self {
            max_body_chars,
            source_label: source_label.to_string(),
            read_more_label: read_more_label.to_string(),
        }
    }

    pub fn format(&self, title: &str, source: &str, content: &str, link: &str) -> String {
        let body = truncate_chars(content, self.max_body_chars);

        let mut message = String::with_capacity(body.len() + 256);
        message.push_str("<b><u>");
        escape_text(title, &mut message);
        message.push_str("</u></b>\n<i>");
        escape_text(&self.source_label, &mut message);
        message.push_str(": ");
        escape_text(source, &mut message);
        message.push_str("</i>\n\n");
        escape_text(body, &mut message);
        message.push_str("\n<a href=\"");
        escape_attribute(link, &mut message);
        message.push_str("\">");
        escape_text(&self.read_more_label, &mut message);
        message.push_str("</a>");

        sanitize_html(&message, ALLOWED_TAGS)
    }
}

/// Hard cutoff at `max` characters. Never splits a multi-byte character.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://lenta.ru/news/1/";

    fn formatter() -> MessageFormatter {
        MessageFormatter::new(MAX_BODY_CHARS, "Source", "Read more")
    }

    /// Character count of everything the formatter adds around the body.
    fn frame_len(title: &str, source: &str) -> usize {
        formatter().format(title, source, "", LINK).chars().count()
    }

    #[test]
    fn test_layout() {
        let message = formatter().format("Headline", "lenta.ru", "Body text.", LINK);
        assert_eq!(
            message,
            "<b><u>Headline</u></b>\n<i>Source: lenta.ru</i>\n\nBody text.\n<a href=\"https://lenta.ru/news/1/\">Read more</a>"
        );
    }

    #[test]
    fn test_body_never_exceeds_budget() {
        let frame = frame_len("Headline", "lenta.ru");

        for len in [0, MAX_BODY_CHARS - 1, MAX_BODY_CHARS, MAX_BODY_CHARS + 1000] {
            let content = "ж".repeat(len);
            let message = formatter().format("Headline", "lenta.ru", &content, LINK);
            let body_len = message.chars().count() - frame;

            assert_eq!(body_len, len.min(MAX_BODY_CHARS), "content length {len}");
        }
    }

    #[test]
    fn test_truncate_chars_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn test_angle_bracket_in_body_keeps_text_and_footer() {
        let message = formatter().format("Title", "lenta.ru", "Inflation fell to x <y% by spring", LINK);
        assert_eq!(
            message,
            "<b><u>Title</u></b>\n<i>Source: lenta.ru</i>\n\nInflation fell to x &lt;y% by spring\n<a href=\"https://lenta.ru/news/1/\">Read more</a>"
        );
    }

    #[test]
    fn test_angle_bracket_in_title_stays_in_header() {
        let message = formatter().format("Rates a<b rise", "lenta.ru", "Body.", LINK);
        assert!(message.starts_with("<b><u>Rates a&lt;b rise</u></b>\n<i>Source: lenta.ru</i>"));
        assert!(message.ends_with("<a href=\"https://lenta.ru/news/1/\">Read more</a>"));
    }

    #[test]
    fn test_markup_in_plain_text_is_shown_literally() {
        let message = formatter().format("T", "s", "<script><b>X</b></script> & co", LINK);
        assert!(message.contains("&lt;script&gt;&lt;b&gt;X&lt;/b&gt;&lt;/script&gt; &amp; co"));
        assert!(!message.contains("<script"));
    }

    #[test]
    fn test_link_is_attribute_escaped() {
        let message = formatter().format("T", "s", "b", "https://a.example/?q=\"x\"&r=1");
        assert!(message.ends_with("<a href=\"https://a.example/?q=&quot;x&quot;&amp;r=1\">Read more</a>"));
    }
}
