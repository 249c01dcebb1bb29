use url::Url;

use crate::types::{ArticleContent, DocumentMetadata};

pub const FALLBACK_TITLE: &str = "Article";
pub const INVALID_AUTHOR: &str = "invalid URL";

/// Value of the first `"<name>: "` line, trimmed. Empty values are skipped.
pub fn extract_field(raw_text: &str, name: &str) -> Option<String> {
    raw_text.lines().find_map(|line| {
        line.strip_prefix(name)
            .and_then(|rest| rest.strip_prefix(": "))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

pub fn extract_title(raw_text: &str) -> String {
    extract_field(raw_text, "Title").unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

/// Host of `source_url` (with port when one is given), or [`INVALID_AUTHOR`].
pub fn extract_author(source_url: &str) -> String {
    let Ok(parsed) = Url::parse(source_url) else {
        return INVALID_AUTHOR.to_string();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => INVALID_AUTHOR.to_string(),
    }
}

impl DocumentMetadata {
    pub fn extract(source_url: &str, content: &ArticleContent) -> Self {
        Self {
            title: extract_title(&content.raw_text),
            author: extract_author(source_url),
            description: format!("Converted from {source_url}"),
            identifier: source_url.to_string(),
            published: extract_field(&content.raw_text, "Published Time"),
        }
    }
}
