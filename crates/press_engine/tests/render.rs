use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use press_engine::render::{
    EngineLauncher, EngineSession, EpubRenderer, EpubSettings, FontAsset,
    FrontmatterHtmlRenderer, PdfPageOptions, PdfSettings, StyledPdfRenderer,
};
use press_engine::{
    ArticleContent, DocumentFormat, DocumentMetadata, DocumentRenderer, RenderError,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(press_logging::initialize_for_tests);
}

fn content() -> ArticleContent {
    ArticleContent::new("Title: Hello\n\n# Heading\n\nBody text & more.\n")
}

fn metadata() -> DocumentMetadata {
    DocumentMetadata {
        title: "Hello".to_string(),
        author: "example.com".to_string(),
        description: "Converted from https://example.com/a".to_string(),
        identifier: "https://example.com/a".to_string(),
        published: Some("2024-05-01".to_string()),
    }
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut file = archive.by_name(name).unwrap_or_else(|_| panic!("missing {name}"));
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}

#[tokio::test]
async fn epub_is_a_valid_single_section_container() {
    let renderer = EpubRenderer::new(EpubSettings {
        language: "en".to_string(),
        modified_utc: Arc::new(|| "2024-01-01T00:00:00Z".to_string()),
    });

    let doc = renderer.render(&content(), &metadata()).await.unwrap();
    assert_eq!(doc.format, DocumentFormat::Epub);
    assert_eq!(doc.mime_type(), "application/epub+zip");
    assert_eq!(doc.extension(), "epub");

    let mut archive = zip::ZipArchive::new(Cursor::new(doc.bytes.to_vec())).unwrap();
    {
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), zip::CompressionMethod::Stored);
    }
    assert_eq!(read_entry(&mut archive, "mimetype"), "application/epub+zip");
    assert!(read_entry(&mut archive, "META-INF/container.xml").contains("OEBPS/content.opf"));

    let opf = read_entry(&mut archive, "OEBPS/content.opf");
    assert!(opf.contains("<dc:title>Hello</dc:title>"));
    assert!(opf.contains("<dc:creator>example.com</dc:creator>"));
    assert!(opf.contains("<dc:identifier id=\"book-id\">https://example.com/a</dc:identifier>"));
    assert!(opf.contains("<dc:description>Converted from https://example.com/a</dc:description>"));
    assert!(opf.contains("<dc:date>2024-05-01</dc:date>"));
    assert!(opf.contains("<meta property=\"dcterms:modified\">2024-01-01T00:00:00Z</meta>"));
    // The cover page is XHTML, so it is referenced from the guide and not as a cover image.
    assert!(!opf.contains("<meta name=\"cover\""));
    assert!(opf.contains("<reference type=\"cover\" title=\"Cover\" href=\"cover.xhtml\"/>"));

    let section = read_entry(&mut archive, "OEBPS/content.xhtml");
    assert!(section.contains("<h1>Heading</h1>"));
    assert!(section.contains("Body text &amp; more."));

    let cover = read_entry(&mut archive, "OEBPS/cover.xhtml");
    assert!(cover.contains("<h1>Hello</h1>"));
    assert!(read_entry(&mut archive, "OEBPS/nav.xhtml").contains("Main Content"));
    assert!(read_entry(&mut archive, "OEBPS/toc.ncx").contains("content.xhtml"));
}

#[tokio::test]
async fn epub_escapes_metadata() {
    let mut meta = metadata();
    meta.title = "Fish & <Chips>".to_string();
    let doc = EpubRenderer::default().render(&content(), &meta).await.unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(doc.bytes.to_vec())).unwrap();
    let opf = read_entry(&mut archive, "OEBPS/content.opf");
    assert!(opf.contains("<dc:title>Fish &amp; &lt;Chips&gt;</dc:title>"));
}

#[tokio::test]
async fn frontmatter_html_carries_provenance_without_shell() {
    let doc = FrontmatterHtmlRenderer
        .render(&content(), &metadata())
        .await
        .unwrap();
    assert_eq!(doc.mime_type(), "text/html; charset=utf-8");
    let html = String::from_utf8(doc.bytes.to_vec()).unwrap();
    assert!(html.contains("title: Hello"));
    assert!(html.contains("author: example.com"));
    assert!(html.contains("<h1>Heading</h1>"));
    assert!(!html.contains("<html"));
    assert!(!html.contains("<style"));
}

#[derive(Default)]
struct EngineLog {
    launched: AtomicUsize,
    closed: AtomicUsize,
    loaded_html: Mutex<Option<String>>,
    printed_with: Mutex<Option<PdfPageOptions>>,
}

#[derive(Clone, Copy)]
enum Behaviour {
    Succeed,
    HangOnLoad,
    FailPrint,
    FailLaunch,
}

struct FakeLauncher {
    log: Arc<EngineLog>,
    behaviour: Behaviour,
}

struct FakeSession {
    log: Arc<EngineLog>,
    behaviour: Behaviour,
}

#[async_trait::async_trait]
impl EngineLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn EngineSession>, RenderError> {
        if let Behaviour::FailLaunch = self.behaviour {
            return Err(RenderError::EngineLaunch("no browser".into()));
        }
        self.log.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            log: self.log.clone(),
            behaviour: self.behaviour,
        }))
    }
}

#[async_trait::async_trait]
impl EngineSession for FakeSession {
    async fn load_html(&mut self, html: &str) -> Result<(), RenderError> {
        if let Behaviour::HangOnLoad = self.behaviour {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        *self.log.loaded_html.lock().unwrap() = Some(html.to_string());
        Ok(())
    }

    async fn body_text(&mut self) -> Result<String, RenderError> {
        Ok("Hello Source: example.com Heading Body text".to_string())
    }

    async fn print_pdf(&mut self, options: &PdfPageOptions) -> Result<Vec<u8>, RenderError> {
        if let Behaviour::FailPrint = self.behaviour {
            return Err(RenderError::Engine("printing crashed".into()));
        }
        *self.log.printed_with.lock().unwrap() = Some(*options);
        Ok(b"%PDF-1.7 fake".to_vec())
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn pdf_renderer(behaviour: Behaviour) -> (StyledPdfRenderer, Arc<EngineLog>) {
    let log = Arc::new(EngineLog::default());
    let launcher = Arc::new(FakeLauncher {
        log: log.clone(),
        behaviour,
    });
    let settings = PdfSettings {
        content_timeout: Duration::from_millis(50),
        ..PdfSettings::default()
    };
    let renderer = StyledPdfRenderer::new(
        launcher,
        FontAsset::from_ttf_bytes("Reader", b"font-bytes"),
        settings,
    );
    (renderer, log)
}

#[tokio::test]
async fn pdf_render_drives_engine_and_releases_it() {
    init_logging();
    let (renderer, log) = pdf_renderer(Behaviour::Succeed);

    let doc = renderer.render(&content(), &metadata()).await.unwrap();
    assert_eq!(doc.format, DocumentFormat::Pdf);
    assert!(doc.bytes.starts_with(b"%PDF"));
    assert_eq!(log.launched.load(Ordering::SeqCst), 1);
    assert_eq!(log.closed.load(Ordering::SeqCst), 1);

    let html = log.loaded_html.lock().unwrap().clone().unwrap();
    assert!(html.contains("<p class=\"byline\">Source: example.com</p>"));
    assert!(html.contains("@font-face"));
    assert_eq!(*log.printed_with.lock().unwrap(), Some(PdfPageOptions::default()));
}

#[tokio::test]
async fn pdf_content_timeout_fails_and_still_releases_engine() {
    init_logging();
    let (renderer, log) = pdf_renderer(Behaviour::HangOnLoad);

    let err = renderer.render(&content(), &metadata()).await.unwrap_err();
    assert_eq!(
        err,
        RenderError::ContentTimeout {
            timeout: Duration::from_millis(50)
        }
    );
    assert_eq!(log.launched.load(Ordering::SeqCst), 1);
    assert_eq!(log.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pdf_print_failure_releases_engine() {
    init_logging();
    let (renderer, log) = pdf_renderer(Behaviour::FailPrint);

    let err = renderer.render(&content(), &metadata()).await.unwrap_err();
    assert!(matches!(err, RenderError::Engine(_)));
    assert_eq!(log.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pdf_launch_failure_is_reported() {
    init_logging();
    let (renderer, log) = pdf_renderer(Behaviour::FailLaunch);

    let err = renderer.render(&content(), &metadata()).await.unwrap_err();
    assert!(matches!(err, RenderError::EngineLaunch(_)));
    assert_eq!(log.launched.load(Ordering::SeqCst), 0);
    assert_eq!(log.closed.load(Ordering::SeqCst), 0);
}
