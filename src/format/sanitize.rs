use scraper::{ElementRef, Html, Node};

/// Elements whose content the HTML parser keeps as raw text. When one of them
/// is unwrapped its text is parsed again so that markup inside is sanitized
/// instead of being shown as literal tags.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
    "plaintext",
];

/// Bound on how many raw-text layers get re-parsed.
const MAX_REPARSE_DEPTH: usize = 8;

/// Strips every tag that is not in `allowed`, keeping its children in place.
/// Comments and doctypes are dropped. Allowed tags keep only the attributes
/// Telegram understands (`href` on links, `class` on code).
pub fn sanitize_html(raw: &str, allowed: &[&str]) -> String {
    let mut out = String::with_capacity(raw.len());
    sanitize_into(raw, allowed, &mut out, 0);
    out
}

fn sanitize_into(raw: &str, allowed: &[&str], out: &mut String, depth: usize) {
    let fragment = Html::parse_fragment(raw);
    write_children(fragment.root_element(), allowed, out, depth);
}

fn write_children(element: ElementRef<'_>, allowed: &[&str], out: &mut String, depth: usize) {
    let raw_text = RAW_TEXT_ELEMENTS.contains(&element.value().name());

    for child in element.children() {
        match child.value() {
            Node::Text(text) if raw_text && depth < MAX_REPARSE_DEPTH => {
                sanitize_into(text, allowed, out, depth + 1);
            }
            Node::Text(text) => escape_text(text, out),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, allowed, out, depth);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, allowed: &[&str], out: &mut String, depth: usize) {
    let name = element.value().name();
    if !allowed.contains(&name) {
        write_children(element, allowed, out, depth);
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        if is_kept_attribute(name, attr) {
            out.push(' ');
            out.push_str(attr);
            out.push_str("=\"");
            escape_attribute(value, out);
            out.push('"');
        }
    }
    out.push('>');

    write_children(element, allowed, out, depth);

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn is_kept_attribute(tag: &str, attr: &str) -> bool {
    matches!((tag, attr), ("a", "href") | ("code", "class"))
}

pub fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

pub fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ALLOWED_TAGS;

    fn clean(raw: &str) -> String {
        sanitize_html(raw, ALLOWED_TAGS)
    }

    #[test]
    fn test_allowed_tags_pass_through() {
        assert_eq!(
            clean(r#"<b>bold</b> <i>it</i> <u>u</u> <code>x</code> <pre>y</pre>"#),
            r#"<b>bold</b> <i>it</i> <u>u</u> <code>x</code> <pre>y</pre>"#
        );
    }

    #[test]
    fn test_disallowed_tags_are_unwrapped_not_deleted() {
        assert_eq!(
            clean(r#"<div class="x"><p>Hello <span>big</span> <b>world</b></p></div>"#),
            "Hello big <b>world</b>"
        );
    }

    #[test]
    fn test_script_around_emphasis_keeps_text_and_emphasis() {
        let out = clean("<script><b>X</b></script>");
        assert_eq!(out, "<b>X</b>");
        assert!(!out.contains("script"));
    }

    #[test]
    fn test_nested_disallowed_layers() {
        let out = clean("<style><div><script><i>deep</i></script></div></style> tail");
        assert_eq!(out, "<i>deep</i> tail");
    }

    #[test]
    fn test_link_keeps_only_href() {
        assert_eq!(
            clean(r#"<a href="https://a.example/?q=1&amp;r=2" target="_blank" onclick="x()">go</a>"#),
            r#"<a href="https://a.example/?q=1&amp;r=2">go</a>"#
        );
    }

    #[test]
    fn test_text_is_escaped_and_comments_dropped() {
        assert_eq!(clean("a &amp; b <!-- note --> 1 &lt; 2"), "a &amp; b  1 &lt; 2");
    }

    #[test]
    fn test_unclosed_tags_are_closed() {
        assert_eq!(clean("<b>open"), "<b>open</b>");
    }

    #[test]
    fn test_newlines_survive() {
        assert_eq!(clean("<b>t</b>\n<i>s</i>\n\nbody"), "<b>t</b>\n<i>s</i>\n\nbody");
    }
}
