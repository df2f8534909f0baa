//! Markdown to sanitized HTML.
//!
//! Bodies (ticket issue, comments, notes) are written in markdown. Every
//! line break is kept as `<br />`, raw HTML in the source is escaped rather
//! than passed through, and links may only point at http(s)/mailto or
//! relative targets.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Renders user-supplied markdown to HTML that is safe to embed.
pub fn render(source: &str) -> String {
    let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;

    let events = Parser::new_ext(&normalized, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(normalized.len() * 3 / 2);
    html::push_html(&mut out, events);
    out.trim_end().to_string()
}

/// Escapes a single-line plain-text field (subject, file name). Stored
/// text is always escaped; entities already present are decoded first so
/// escaping text that came back from a response leaves it unchanged.
pub fn plain(source: &str) -> String {
    let decoded = html_escape::decode_html_entities(source.trim());
    html_escape::encode_text(&decoded).into_owned()
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        CowStr::Borrowed("#")
    }
}

fn is_safe_url(url: &str) -> bool {
    let lowered = url.trim().to_ascii_lowercase();
    match lowered.split_once(':') {
        Some((scheme, _)) if !scheme.contains('/') && !scheme.contains('?') && !scheme.contains('#') => {
            matches!(scheme, "http" | "https" | "mailto")
        }
        _ => true,
    }
}
