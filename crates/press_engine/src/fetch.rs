use std::time::Duration;

use futures_util::StreamExt;
use press_logging::{press_debug, press_info};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::decode::decode_text;
use crate::error::{FailureKind, FetchError};
use crate::types::ArticleContent;

pub const DEFAULT_EXTRACTION_BASE: &str = "https://r.jina.ai";
pub const RESPOND_WITH_HEADER: &str = "x-respond-with";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Extraction service; the target URL is appended as the path.
    pub extraction_base: String,
    /// Value of the `x-respond-with` header asking for normalized text.
    pub respond_with: String,
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            extraction_base: DEFAULT_EXTRACTION_BASE.to_string(),
            respond_with: "markdown".to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Retrieves normalized article text for a source URL. One attempt, no retries.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, source_url: &Url) -> Result<ArticleContent, FetchError>;
}

/// Fetches through a reader-style extraction service (`GET <base>/<target>`).
#[derive(Debug, Clone)]
pub struct ReaderFetcher {
    settings: FetchSettings,
}

impl ReaderFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(
                self.settings.redirect_limit,
            ))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn extraction_url(&self, source_url: &Url) -> Result<reqwest::Url, FetchError> {
        let joined = format!(
            "{}/{}",
            self.settings.extraction_base.trim_end_matches('/'),
            source_url
        );
        reqwest::Url::parse(&joined)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ContentFetcher for ReaderFetcher {
    async fn fetch(&self, source_url: &Url) -> Result<ArticleContent, FetchError> {
        let target = self.extraction_url(source_url)?;
        let client = self.build_client()?;
        press_info!("Fetching {} via {}", source_url, target);

        let mut request = client
            .get(target)
            .header(RESPOND_WITH_HEADER, self.settings.respond_with.as_str());
        if let Some(key) = self.settings.api_key.as_deref() {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let decoded = decode_text(&bytes, content_type.as_deref())
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        if decoded.text.trim().is_empty() {
            return Err(FetchError::new(FailureKind::EmptyBody, "No content received."));
        }

        press_debug!(
            "Fetched {} bytes ({}) for {}",
            bytes.len(),
            decoded.encoding_label,
            source_url
        );
        Ok(ArticleContent::new(decoded.text))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
