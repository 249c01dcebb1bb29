use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("font asset {path} could not be read: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("font asset {0} is empty")]
    Empty(String),
    #[error("font asset {0} has an unsupported extension (expected ttf, otf, woff or woff2)")]
    UnsupportedFormat(String),
}

/// A font file inlined as base64 for an `@font-face` rule. Loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontAsset {
    family: String,
    mime: &'static str,
    css_format: &'static str,
    base64: String,
}

impl FontAsset {
    pub fn load(path: &Path, family: impl Into<String>) -> Result<Self, FontError> {
        let display = path.display().to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let (mime, css_format) =
            formats_for(&extension).ok_or_else(|| FontError::UnsupportedFormat(display.clone()))?;
        let bytes = fs::read(path).map_err(|source| FontError::Read {
            path: display.clone(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(FontError::Empty(display));
        }
        Ok(Self {
            family: family.into(),
            mime,
            css_format,
            base64: STANDARD.encode(bytes),
        })
    }

    /// In-memory TrueType font, mainly for tests.
    pub fn from_ttf_bytes(family: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            family: family.into(),
            mime: "font/ttf",
            css_format: "truetype",
            base64: STANDARD.encode(bytes),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn font_face_css(&self) -> String {
        format!(
            "@font-face {{\n  font-family: '{family}';\n  src: url(data:{mime};base64,{data}) format('{format}');\n  font-weight: normal;\n  font-style: normal;\n}}\n",
            family = self.family,
            mime = self.mime,
            data = self.base64,
            format = self.css_format,
        )
    }
}

fn formats_for(extension: &str) -> Option<(&'static str, &'static str)> {
    match extension {
        "ttf" => Some(("font/ttf", "truetype")),
        "otf" => Some(("font/otf", "opentype")),
        "woff" => Some(("font/woff", "woff")),
        "woff2" => Some(("font/woff2", "woff2")),
        _ => None,
    }
}
