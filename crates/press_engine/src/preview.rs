const TRUNCATED_MARKER: &str = "…[truncated]";

/// First `max_chars` characters of `text` with whitespace runs collapsed, for log lines.
pub fn preview_text(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(max_chars).collect();
    format!("{truncated}{TRUNCATED_MARKER}")
}
