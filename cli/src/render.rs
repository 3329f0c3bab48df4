//! Text rendering for terminal output and handler payloads.

use std::fmt::Write as _;

use assist_library::{Bookmark, Output};

/// Longest content preview printed in listings.
const PREVIEW_CHARS: usize = 80;

pub fn bookmark_line(bookmark: &Bookmark) -> String {
    let mut line = format!("{}  {}  {}", bookmark.id, bookmark.title, bookmark.url);
    if !bookmark.keywords.is_empty() {
        let _ = write!(line, "  [{}]", bookmark.keywords.join(", "));
    }
    line
}

pub fn output_line(output: &Output) -> String {
    format!(
        "{}  {}  {}  {}",
        output.id,
        output.timestamp.format("%Y-%m-%d %H:%M"),
        output.kind,
        preview(&output.content)
    )
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

/// Markup list of bookmarks for the side panel.
pub fn bookmark_list_html(bookmarks: &[Bookmark]) -> String {
    let mut html = String::from("<ul>");
    for bookmark in bookmarks {
        let _ = write!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            escape(&bookmark.url),
            escape(&bookmark.title)
        );
    }
    html.push_str("</ul>");
    html
}

/// Markup list of outputs for the side panel.
pub fn output_list_html(outputs: &[Output]) -> String {
    let mut html = String::from("<ul>");
    for output in outputs {
        let _ = write!(
            html,
            "<li><b>{}</b> {}</li>",
            output.kind,
            escape(&preview(&output.content))
        );
    }
    html.push_str("</ul>");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
