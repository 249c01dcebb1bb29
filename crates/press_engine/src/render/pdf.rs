use std::sync::Arc;
use std::time::Duration;

use html_escape::encode_text;
use press_logging::{press_debug, press_info, press_warn};

use crate::convert::markdown_to_html;
use crate::error::RenderError;
use crate::preview::preview_text;
use crate::types::{ArticleContent, DocumentFormat, DocumentMetadata, RenderedDocument};

use super::engine::{EngineLauncher, EngineSession, PdfPageOptions};
use super::font::FontAsset;
use super::DocumentRenderer;

const STYLESHEET: &str = r#"
* { box-sizing: border-box; }
html { font-size: 12pt; }
body {
  font-family: var(--body-font), Georgia, 'Times New Roman', serif;
  line-height: 1.6;
  color: #1a1a1a;
  max-width: 42em;
  margin: 0 auto;
  hyphens: auto;
  -webkit-print-color-adjust: exact;
}
h1, h2, h3, h4, h5, h6 {
  line-height: 1.25;
  margin: 1.6em 0 0.6em;
  page-break-after: avoid;
}
h1.article-title { font-size: 2em; margin-top: 0; }
p.byline {
  color: #666;
  font-size: 0.9em;
  margin: 0 0 2em;
  padding-bottom: 0.8em;
  border-bottom: 1px solid #ddd;
}
p { margin: 0 0 1em; orphans: 3; widows: 3; }
a { color: #1a4e8a; text-decoration: none; word-break: break-word; }
code {
  font-family: 'SFMono-Regular', Menlo, Consolas, monospace;
  font-size: 0.85em;
  background: #f4f4f4;
  padding: 0.1em 0.3em;
  border-radius: 3px;
}
pre {
  background: #f4f4f4;
  border: 1px solid #e2e2e2;
  border-radius: 4px;
  padding: 0.8em 1em;
  overflow-x: auto;
  white-space: pre-wrap;
  word-wrap: break-word;
  page-break-inside: avoid;
}
pre code { background: none; padding: 0; font-size: 0.8em; }
blockquote {
  margin: 1em 0;
  padding: 0.2em 1em;
  border-left: 4px solid #ccc;
  color: #555;
  font-style: italic;
}
img, svg, video {
  max-width: 100%;
  height: auto;
  display: block;
  margin: 1em auto;
  page-break-inside: avoid;
}
table { border-collapse: collapse; width: 100%; margin: 1em 0; font-size: 0.9em; }
th, td { border: 1px solid #ddd; padding: 0.4em 0.6em; text-align: left; }
hr { border: none; border-top: 1px solid #ddd; margin: 2em 0; }
"#;

#[derive(Debug, Clone)]
pub struct PdfSettings {
    /// Upper bound for loading the HTML into the engine.
    pub content_timeout: Duration,
    /// Characters of rendered body text to log; `0` skips the read-back.
    pub preview_chars: usize,
    pub page: PdfPageOptions,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            content_timeout: Duration::from_secs(30),
            preview_chars: 200,
            page: PdfPageOptions::default(),
        }
    }
}

/// Standalone HTML document for print: inlined font, fixed stylesheet, title and byline.
pub fn build_styled_html(
    content: &ArticleContent,
    metadata: &DocumentMetadata,
    font: &FontAsset,
) -> String {
    let body = markdown_to_html(&content.raw_text);
    let title = encode_text(&metadata.title);
    let author = encode_text(&metadata.author);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n{font_face}:root {{ --body-font: '{family}'; }}\n{STYLESHEET}</style>\n</head>\n<body>\n<h1 class=\"article-title\">{title}</h1>\n<p class=\"byline\">Source: {author}</p>\n<article>\n{body}</article>\n</body>\n</html>\n",
        font_face = font.font_face_css(),
        family = font.family(),
    )
}

/// Prints the styled article to PDF through a headless engine launched per render.
pub struct StyledPdfRenderer {
    launcher: Arc<dyn EngineLauncher>,
    font: FontAsset,
    settings: PdfSettings,
}

impl StyledPdfRenderer {
    pub fn new(launcher: Arc<dyn EngineLauncher>, font: FontAsset, settings: PdfSettings) -> Self {
        Self {
            launcher,
            font,
            settings,
        }
    }

    async fn drive(
        &self,
        session: &mut dyn EngineSession,
        html: &str,
        title: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let timeout = self.settings.content_timeout;
        tokio::time::timeout(timeout, session.load_html(html))
            .await
            .map_err(|_| RenderError::ContentTimeout { timeout })??;

        if self.settings.preview_chars > 0 {
            match session.body_text().await {
                Ok(text) => press_debug!(
                    "Rendered body of {:?}: {}",
                    title,
                    preview_text(&text, self.settings.preview_chars)
                ),
                Err(err) => press_warn!("Could not read rendered body of {:?}: {}", title, err),
            }
        }

        let pdf = session.print_pdf(&self.settings.page).await?;
        if pdf.is_empty() {
            return Err(RenderError::EmptyOutput(DocumentFormat::Pdf));
        }
        Ok(pdf)
    }
}

#[async_trait::async_trait]
impl DocumentRenderer for StyledPdfRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    async fn render(
        &self,
        content: &ArticleContent,
        metadata: &DocumentMetadata,
    ) -> Result<RenderedDocument, RenderError> {
        let html = build_styled_html(content, metadata, &self.font);

        let mut session = self.launcher.launch().await?;
        let outcome = self.drive(session.as_mut(), &html, &metadata.title).await;
        // Release runs regardless of how the render went.
        if let Err(err) = session.close().await {
            press_warn!("Rendering engine did not shut down cleanly: {}", err);
        }

        let pdf = outcome?;
        press_info!("Printed {:?} to PDF ({} bytes)", metadata.title, pdf.len());
        Ok(RenderedDocument::new(DocumentFormat::Pdf, pdf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            title: "Fish & <Chips>".to_string(),
            author: "example.com".to_string(),
            description: String::new(),
            identifier: "https://example.com/a".to_string(),
            published: None,
        }
    }

    #[test]
    fn styled_html_embeds_font_title_and_byline() {
        let font = FontAsset::from_ttf_bytes("Reader", b"ttf");
        let html = build_styled_html(
            &ArticleContent::new("Title: x\n\n> quoted\n\n```\ncode\n```"),
            &metadata(),
            &font,
        );

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("font-family: 'Reader'"));
        assert!(html.contains("base64,dHRm"));
        assert!(html.contains("<h1 class=\"article-title\">Fish &amp; &lt;Chips&gt;</h1>"));
        assert!(html.contains("<p class=\"byline\">Source: example.com</p>"));
        assert!(html.contains("<blockquote>"));
        assert!(html.contains("<pre><code>code"));
        assert!(html.contains("max-width: 100%"));
    }

    #[test]
    fn default_page_is_a4_with_margins() {
        let page = PdfSettings::default().page;
        assert_eq!(page.paper_width_mm, 210.0);
        assert_eq!(page.paper_height_mm, 297.0);
        assert_eq!(page.margin_top_mm, 20.0);
        assert_eq!(page.margin_left_mm, 15.0);
        assert!(page.print_background);
    }
}
