use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;

/// Pipeline stage, used to attribute failures and in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Fetching,
    ExtractingMetadata,
    Sanitizing,
    Rendering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validate",
            Stage::Fetching => "fetch",
            Stage::ExtractingMetadata => "metadata",
            Stage::Sanitizing => "sanitize",
            Stage::Rendering => "render",
        };
        f.write_str(name)
    }
}

/// A validated conversion request. Only constructible through [`ConversionRequest::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    source_url: Url,
}

impl ConversionRequest {
    /// Accepts absolute `http`/`https` URLs that carry a host.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        let source_url =
            Url::parse(trimmed).map_err(|err| ValidationError::InvalidUrl(err.to_string()))?;
        if !matches!(source_url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidUrl(format!(
                "unsupported scheme {}",
                source_url.scheme()
            )));
        }
        if source_url.host_str().is_none() {
            return Err(ValidationError::InvalidUrl("missing host".into()));
        }
        Ok(Self { source_url })
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub raw_text: String,
}

impl ArticleContent {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub description: String,
    pub identifier: String,
    pub published: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Epub,
    Html,
    Pdf,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 3] =
        [DocumentFormat::Epub, DocumentFormat::Html, DocumentFormat::Pdf];

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentFormat::Epub => "application/epub+zip",
            DocumentFormat::Html => "text/html; charset=utf-8",
            DocumentFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Epub => "epub",
            DocumentFormat::Html => "html",
            DocumentFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document format {0:?}")]
pub struct UnknownFormat(pub String);

impl FromStr for DocumentFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epub" => Ok(DocumentFormat::Epub),
            "html" => Ok(DocumentFormat::Html),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Binary artifact of one render. Owned by a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Bytes,
    pub format: DocumentFormat,
}

impl RenderedDocument {
    pub fn new(format: DocumentFormat, bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    /// `<safe title>.<extension>`
    pub filename: String,
    pub metadata: DocumentMetadata,
    pub document: RenderedDocument,
}
