use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use press_engine::render::FrontmatterHtmlRenderer;
use press_engine::{
    ArticleContent, ContentFetcher, ConversionPipeline, ConversionRequest, ConvertError,
    DocumentFormat, FetchError, FetchSettings, ReaderFetcher, SanitizeOptions, Stage,
};
use url::Url;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticFetcher {
    text: &'static str,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch(&self, _source_url: &Url) -> Result<ArticleContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ArticleContent::new(self.text))
    }
}

fn request(url: &str) -> ConversionRequest {
    ConversionRequest::parse(url).unwrap()
}

#[tokio::test]
async fn pipeline_names_file_after_title() {
    let fetcher = Arc::new(StaticFetcher {
        text: "Title: Hello World!\nBody text",
        calls: AtomicUsize::new(0),
    });
    let pipeline = ConversionPipeline::new(fetcher.clone(), SanitizeOptions::default());

    let converted = pipeline
        .convert(&request("https://example.com/a"), &FrontmatterHtmlRenderer)
        .await
        .unwrap();

    assert_eq!(converted.filename, "hello_world!.html");
    assert_eq!(converted.metadata.title, "Hello World!");
    assert_eq!(converted.metadata.author, "example.com");
    assert_eq!(converted.document.format, DocumentFormat::Html);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn untitled_text_uses_fallback_names() {
    let fetcher = Arc::new(StaticFetcher {
        text: "no metadata line at all",
        calls: AtomicUsize::new(0),
    });
    let pipeline = ConversionPipeline::new(fetcher, SanitizeOptions::default());

    let converted = pipeline
        .convert(&request("https://example.com/a"), &FrontmatterHtmlRenderer)
        .await
        .unwrap();
    assert_eq!(converted.metadata.title, "Article");
    assert_eq!(converted.filename, "article.html");
}

#[tokio::test]
async fn title_of_only_illegal_characters_falls_back() {
    let fetcher = Arc::new(StaticFetcher {
        text: "Title: \"???\"\nbody",
        calls: AtomicUsize::new(0),
    });
    let pipeline = ConversionPipeline::new(fetcher, SanitizeOptions::default());

    let converted = pipeline
        .convert(&request("https://example.com/a"), &FrontmatterHtmlRenderer)
        .await
        .unwrap();
    assert_eq!(converted.filename, "article.html");
}

#[tokio::test]
async fn fetch_failure_is_tagged_with_stage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let fetcher = Arc::new(ReaderFetcher::new(FetchSettings {
        extraction_base: server.uri(),
        ..FetchSettings::default()
    }));
    let pipeline = ConversionPipeline::new(fetcher, SanitizeOptions::default());

    let err = pipeline
        .convert(&request("https://example.com/a"), &FrontmatterHtmlRenderer)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Fetch(_)));
    assert_eq!(err.stage(), Stage::Fetching);
    assert!(!err.is_client_error());
}
