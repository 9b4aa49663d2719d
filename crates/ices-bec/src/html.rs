use ices_core::{BodyContentType, EmailBody};
use scraper::Html;

const SNIFF_WINDOW: usize = 50;

fn looks_like_html(body: &EmailBody) -> bool {
    body.content_type == BodyContentType::Html || body.content.chars().take(SNIFF_WINDOW).any(|c| c == '<')
}

/// Strips tags from an HTML body, dropping the contents of `<style>`,
/// `<script>`, and `<head>` entirely rather than emitting their text nodes.
/// Falls back to a blunt regex tag-strip if the fragment fails to parse —
/// scraper's parser is lenient enough that this path is mostly theoretical,
/// but a parser error must never propagate out of a read-only analyzer.
fn strip_tags(content: &str) -> String {
    let fragment = Html::parse_fragment(content);
    let skip_selector = scraper::Selector::parse("style, script, head").expect("static selector compiles");
    let skip: std::collections::HashSet<_> = fragment.select(&skip_selector).flat_map(|el| el.descendants().map(|n| n.id())).collect();

    let mut text = String::new();
    for node in fragment.tree.nodes() {
        if skip.contains(&node.id()) {
            continue;
        }
        if let Some(t) = node.value().as_text() {
            text.push_str(t);
            text.push(' ');
        }
    }

    if text.trim().is_empty() && content.contains('<') {
        return regex_strip_tags(content);
    }
    text
}

fn regex_strip_tags(content: &str) -> String {
    static TAG: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    TAG.get_or_init(|| regex::Regex::new(r"<[^>]*>").expect("static pattern compiles"))
        .replace_all(content, " ")
        .into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Produces the plain-text form of a message used by content-signal
/// scanning and intent classification: HTML stripped (if applicable),
/// whitespace collapsed, subject prepended.
#[must_use]
pub fn prepare_text(subject: &str, body: &EmailBody) -> String {
    let plain = if looks_like_html(body) { strip_tags(&body.content) } else { body.content.clone() };
    format!("Subject: {}\n\n{}", subject, collapse_whitespace(&plain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_style_and_script_content() {
        let html = "<html><head><style>.a{color:red}</style></head><body><script>evil()</script><p>Hello <b>World</b></p></body></html>";
        let body = EmailBody { content_type: BodyContentType::Html, content: html.to_string() };
        let text = prepare_text("Greeting", &body);
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains("color:red"));
        assert!(!text.contains("evil()"));
    }

    #[test]
    fn plain_text_body_passes_through() {
        let body = EmailBody { content_type: BodyContentType::Text, content: "Hi   there\nfriend".to_string() };
        let text = prepare_text("Hello", &body);
        assert_eq!(text, "Subject: Hello\n\nHi there friend");
    }

    #[test]
    fn sniffs_html_in_text_typed_body() {
        let body = EmailBody { content_type: BodyContentType::Text, content: "<p>looks html but mistyped</p>".to_string() };
        let text = prepare_text("S", &body);
        assert!(!text.contains('<'));
        assert!(text.contains("looks html"));
    }
}
