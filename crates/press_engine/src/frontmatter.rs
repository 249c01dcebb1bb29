use crate::types::DocumentMetadata;

/// Prepends a `title`/`author` block to the article text.
pub fn with_frontmatter(metadata: &DocumentMetadata, body_markdown: &str) -> String {
    let frontmatter = format!(
        "---\ntitle: {title}\nauthor: {author}\n---\n\n",
        title = single_line(&metadata.title),
        author = single_line(&metadata.author),
    );
    format!("{frontmatter}{body_markdown}")
}

fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
