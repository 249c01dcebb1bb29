use std::sync::Arc;

use press_logging::{press_debug, press_error, press_info};

use crate::error::ConvertError;
use crate::fetch::ContentFetcher;
use crate::filename::{safe_filename, SanitizeOptions};
use crate::render::DocumentRenderer;
use crate::types::{ConversionRequest, ConvertedDocument, DocumentMetadata, Stage};

/// Fetch → metadata → filename → render, shared by every output format.
///
/// Holds no per-request state, so one instance serves all requests.
#[derive(Clone)]
pub struct ConversionPipeline {
    fetcher: Arc<dyn ContentFetcher>,
    sanitize: SanitizeOptions,
}

impl ConversionPipeline {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, sanitize: SanitizeOptions) -> Self {
        Self { fetcher, sanitize }
    }

    pub async fn convert(
        &self,
        request: &ConversionRequest,
        renderer: &dyn DocumentRenderer,
    ) -> Result<ConvertedDocument, ConvertError> {
        let result = self.run(request, renderer).await;
        if let Err(err) = &result {
            press_error!(
                "Conversion failed stage={} format={} url={}: {}",
                err.stage(),
                renderer.format(),
                request.source_url(),
                err
            );
        }
        result
    }

    async fn run(
        &self,
        request: &ConversionRequest,
        renderer: &dyn DocumentRenderer,
    ) -> Result<ConvertedDocument, ConvertError> {
        let source_url = request.source_url();
        press_info!("Processing URL: {}", source_url);

        log_stage(Stage::Fetching, source_url.as_str());
        let content = self.fetcher.fetch(source_url).await?;

        log_stage(Stage::ExtractingMetadata, source_url.as_str());
        let metadata = DocumentMetadata::extract(source_url.as_str(), &content);

        log_stage(Stage::Sanitizing, source_url.as_str());
        let stem = safe_filename(&metadata.title, &self.sanitize);

        log_stage(Stage::Rendering, source_url.as_str());
        let document = renderer.render(&content, &metadata).await?;

        let filename = format!("{stem}.{}", document.extension());
        press_info!(
            "Converted {} to {} ({} bytes)",
            source_url,
            filename,
            document.bytes.len()
        );
        Ok(ConvertedDocument {
            filename,
            metadata,
            document,
        })
    }
}

fn log_stage(stage: Stage, url: &str) {
    press_debug!("stage={} url={}", stage, url);
}
