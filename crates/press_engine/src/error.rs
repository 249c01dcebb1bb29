use std::fmt;
use std::time::Duration;

use crate::types::{DocumentFormat, Stage};

/// Client-caused input problems, reported before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("URL parameter is required")]
    MissingUrl,
    #[error("Invalid URL parameter: could not decode value ({0})")]
    Undecodable(String),
    #[error("Invalid URL parameter: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fetch failed ({kind}): {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    EmptyBody,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::EmptyBody => write!(f, "empty body"),
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("epub packaging failed: {0}")]
    Epub(String),
    #[error("rendering engine failed to launch: {0}")]
    EngineLaunch(String),
    #[error("rendering engine did not finish loading content within {}s", timeout.as_secs_f32())]
    ContentTimeout { timeout: Duration },
    #[error("rendering engine error: {0}")]
    Engine(String),
    #[error("{0} renderer produced no output")]
    EmptyOutput(DocumentFormat),
}

/// Any failure of one conversion, tagged with the stage it came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ConvertError {
    pub fn stage(&self) -> Stage {
        match self {
            ConvertError::Validation(_) => Stage::Validating,
            ConvertError::Fetch(_) => Stage::Fetching,
            ConvertError::Render(_) => Stage::Rendering,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, ConvertError::Validation(_))
    }
}
