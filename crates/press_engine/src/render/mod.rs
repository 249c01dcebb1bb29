//! Output variants. Each renderer turns fetched text plus metadata into one
//! binary artifact; the pipeline does not care which one it drives.
mod chrome;
mod engine;
mod epub;
mod font;
mod html;
mod pdf;

pub use chrome::{ChromeLauncher, ChromeSettings};
pub use engine::{EngineLauncher, EngineSession, PdfPageOptions};
pub use epub::{EpubRenderer, EpubSettings};
pub use font::{FontAsset, FontError};
pub use html::FrontmatterHtmlRenderer;
pub use pdf::{build_styled_html, PdfSettings, StyledPdfRenderer};

use crate::error::RenderError;
use crate::types::{ArticleContent, DocumentFormat, DocumentMetadata, RenderedDocument};

#[async_trait::async_trait]
pub trait DocumentRenderer: Send + Sync {
    fn format(&self) -> DocumentFormat;

    async fn render(
        &self,
        content: &ArticleContent,
        metadata: &DocumentMetadata,
    ) -> Result<RenderedDocument, RenderError>;
}
