//! Article press engine: fetch, metadata, filename and document rendering.
mod convert;
mod decode;
mod error;
mod fetch;
mod filename;
mod frontmatter;
mod metadata;
mod pipeline;
mod preview;
pub mod render;
mod types;

pub use convert::markdown_to_html;
pub use decode::{decode_text, DecodeError, DecodedText};
pub use error::{ConvertError, FailureKind, FetchError, RenderError, ValidationError};
pub use fetch::{
    ContentFetcher, FetchSettings, ReaderFetcher, DEFAULT_EXTRACTION_BASE, RESPOND_WITH_HEADER,
};
pub use filename::{
    safe_filename, sanitize_filename, SanitizeOptions, FALLBACK_FILENAME, MAX_FILENAME_CHARS,
};
pub use frontmatter::with_frontmatter;
pub use metadata::{extract_author, extract_field, extract_title, FALLBACK_TITLE, INVALID_AUTHOR};
pub use pipeline::ConversionPipeline;
pub use preview::preview_text;
pub use render::DocumentRenderer;
pub use types::{
    ArticleContent, ConversionRequest, ConvertedDocument, DocumentFormat, DocumentMetadata,
    RenderedDocument, Stage, UnknownFormat,
};
