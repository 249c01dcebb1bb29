use crate::convert::markdown_to_html;
use crate::error::RenderError;
use crate::frontmatter::with_frontmatter;
use crate::types::{ArticleContent, DocumentFormat, DocumentMetadata, RenderedDocument};

use super::DocumentRenderer;

/// HTML fragment of the article with a visible `title`/`author` block on top.
/// No document shell and no styling.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrontmatterHtmlRenderer;

#[async_trait::async_trait]
impl DocumentRenderer for FrontmatterHtmlRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Html
    }

    async fn render(
        &self,
        content: &ArticleContent,
        metadata: &DocumentMetadata,
    ) -> Result<RenderedDocument, RenderError> {
        let markdown = with_frontmatter(metadata, &content.raw_text);
        let html = markdown_to_html(&markdown);
        if html.trim().is_empty() {
            return Err(RenderError::EmptyOutput(DocumentFormat::Html));
        }
        Ok(RenderedDocument::new(DocumentFormat::Html, html.into_bytes()))
    }
}
