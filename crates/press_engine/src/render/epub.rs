use std::io::{Cursor, Write};
use std::sync::Arc;

use html_escape::{encode_double_quoted_attribute, encode_text};
use press_logging::press_debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::convert::markdown_to_html;
use crate::error::RenderError;
use crate::types::{ArticleContent, DocumentFormat, DocumentMetadata, RenderedDocument};

use super::DocumentRenderer;

const SECTION_TITLE: &str = "Main Content";
const PUBLISHER: &str = "Article Press";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const EPUB_CSS: &str = r#"body { font-family: serif; line-height: 1.5; margin: 0 0.5em; }
h1, h2, h3 { line-height: 1.2; }
.cover { text-align: center; margin-top: 30%; }
.cover h1 { font-size: 1.8em; }
.cover .author { font-style: italic; }
pre { white-space: pre-wrap; font-size: 0.85em; }
code { font-family: monospace; }
blockquote { margin-left: 1em; padding-left: 0.8em; border-left: 3px solid #999; }
img { max-width: 100%; height: auto; }
"#;

type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct EpubSettings {
    /// `dc:language` value.
    pub language: String,
    /// Produces the `dcterms:modified` timestamp (`YYYY-MM-DDThh:mm:ssZ`).
    pub modified_utc: Clock,
}

impl Default for EpubSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            modified_utc: Arc::new(|| {
                chrono::Utc::now()
                    .format("%Y-%m-%dT%H:%M:%SZ")
                    .to_string()
            }),
        }
    }
}

impl std::fmt::Debug for EpubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpubSettings")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

/// Single-section EPUB 3 book (with an NCX for EPUB 2 readers) and a text cover page.
#[derive(Debug, Clone, Default)]
pub struct EpubRenderer {
    settings: EpubSettings,
}

impl EpubRenderer {
    pub fn new(settings: EpubSettings) -> Self {
        Self { settings }
    }

    fn package(&self, body_html: &str, metadata: &DocumentMetadata) -> Result<Vec<u8>, RenderError> {
        let modified = (self.settings.modified_utc)();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // The mimetype entry has to come first and stay uncompressed.
        let entries: [(&str, String, SimpleFileOptions); 8] = [
            ("mimetype", "application/epub+zip".to_string(), stored),
            ("META-INF/container.xml", CONTAINER_XML.to_string(), deflated),
            ("OEBPS/content.opf", self.content_opf(metadata, &modified), deflated),
            ("OEBPS/nav.xhtml", self.nav_xhtml(metadata), deflated),
            ("OEBPS/toc.ncx", toc_ncx(metadata), deflated),
            ("OEBPS/style.css", EPUB_CSS.to_string(), deflated),
            ("OEBPS/cover.xhtml", self.cover_xhtml(metadata), deflated),
            ("OEBPS/content.xhtml", self.section_xhtml(body_html), deflated),
        ];
        for (name, body, options) in entries {
            zip.start_file(name, options).map_err(epub_error)?;
            zip.write_all(body.as_bytes()).map_err(epub_error)?;
        }

        let cursor = zip.finish().map_err(epub_error)?;
        Ok(cursor.into_inner())
    }

    fn content_opf(&self, metadata: &DocumentMetadata, modified: &str) -> String {
        let published = metadata
            .published
            .as_deref()
            .map(|date| format!("    <dc:date>{}</dc:date>\n", encode_text(date)))
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="book-id" xml:lang="{lang}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{identifier}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>{lang}</dc:language>
    <dc:description>{description}</dc:description>
    <dc:publisher>{PUBLISHER}</dc:publisher>
    <dc:source>{identifier}</dc:source>
{published}    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
    <item id="cover" href="cover.xhtml" media-type="application/xhtml+xml"/>
    <item id="content" href="content.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="cover" linear="no"/>
    <itemref idref="content"/>
  </spine>
  <guide>
    <reference type="cover" title="Cover" href="cover.xhtml"/>
    <reference type="text" title="{SECTION_TITLE}" href="content.xhtml"/>
  </guide>
</package>
"#,
            lang = encode_double_quoted_attribute(&self.settings.language),
            identifier = encode_text(&metadata.identifier),
            title = encode_text(&metadata.title),
            author = encode_text(&metadata.author),
            description = encode_text(&metadata.description),
        )
    }

    fn nav_xhtml(&self, metadata: &DocumentMetadata) -> String {
        xhtml_page(
            &self.settings.language,
            &metadata.title,
            &format!(
                "<nav epub:type=\"toc\" id=\"toc\">\n<h1>Contents</h1>\n<ol>\n<li><a href=\"content.xhtml\">{SECTION_TITLE}</a></li>\n</ol>\n</nav>\n"
            ),
        )
    }

    fn cover_xhtml(&self, metadata: &DocumentMetadata) -> String {
        xhtml_page(
            &self.settings.language,
            &metadata.title,
            &format!(
                "<div class=\"cover\">\n<h1>{title}</h1>\n<p class=\"author\">{author}</p>\n<p>{description}</p>\n</div>\n",
                title = encode_text(&metadata.title),
                author = encode_text(&metadata.author),
                description = encode_text(&metadata.description),
            ),
        )
    }

    fn section_xhtml(&self, body_html: &str) -> String {
        xhtml_page(&self.settings.language, SECTION_TITLE, body_html)
    }
}

fn xhtml_page(language: &str, title: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" xml:lang=\"{lang}\" lang=\"{lang}\">\n<head>\n<meta charset=\"UTF-8\"/>\n<title>{title}</title>\n<link rel=\"stylesheet\" type=\"text/css\" href=\"style.css\"/>\n</head>\n<body>\n{body}</body>\n</html>\n",
        lang = encode_double_quoted_attribute(language),
        title = encode_text(title),
    )
}

fn toc_ncx(metadata: &DocumentMetadata) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{identifier}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
    <navPoint id="content" playOrder="1">
      <navLabel><text>{SECTION_TITLE}</text></navLabel>
      <content src="content.xhtml"/>
    </navPoint>
  </navMap>
</ncx>
"#,
        identifier = encode_double_quoted_attribute(&metadata.identifier),
        title = encode_text(&metadata.title),
    )
}

fn epub_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Epub(err.to_string())
}

#[async_trait::async_trait]
impl DocumentRenderer for EpubRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Epub
    }

    async fn render(
        &self,
        content: &ArticleContent,
        metadata: &DocumentMetadata,
    ) -> Result<RenderedDocument, RenderError> {
        press_debug!("Packaging {:?} as EPUB", metadata.title);
        let body_html = markdown_to_html(&content.raw_text);
        let bytes = self.package(&body_html, metadata)?;
        Ok(RenderedDocument::new(DocumentFormat::Epub, bytes))
    }
}
