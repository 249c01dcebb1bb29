use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use press_engine::render::{
    ChromeLauncher, EpubRenderer, FontAsset, FontError, FrontmatterHtmlRenderer,
    StyledPdfRenderer,
};
use press_engine::{ConversionPipeline, DocumentFormat, DocumentRenderer, ReaderFetcher};
use press_logging::{press_info, press_warn};
use tokio::sync::{Semaphore, SemaphorePermit};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ServerConfig;
use crate::routes;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("PDF output is enabled but its font is unusable: {0}")]
    Font(#[from] FontError),
}

/// Renderers available to the router, keyed by the format they produce.
#[derive(Clone, Default)]
pub struct RendererSet {
    renderers: HashMap<DocumentFormat, Arc<dyn DocumentRenderer>>,
}

impl RendererSet {
    pub fn with(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderers.insert(renderer.format(), renderer);
        self
    }

    pub fn get(&self, format: DocumentFormat) -> Option<&Arc<dyn DocumentRenderer>> {
        self.renderers.get(&format)
    }

    pub fn formats(&self) -> Vec<DocumentFormat> {
        DocumentFormat::ALL
            .into_iter()
            .filter(|format| self.renderers.contains_key(format))
            .collect()
    }
}

/// Admission control for conversions. At most `max_concurrent` run at once and
/// each request, time spent queueing included, is bounded by `timeout`.
#[derive(Clone)]
pub struct ConversionLimits {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl ConversionLimits {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.max_concurrent_requests, config.request_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits for a conversion slot. `None` only once the semaphore is closed.
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        self.permits.acquire().await.ok()
    }
}

impl Default for ConversionLimits {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ConversionPipeline>,
    pub renderers: Arc<RendererSet>,
    pub default_format: DocumentFormat,
    pub limits: ConversionLimits,
}

impl AppState {
    pub fn new(
        pipeline: ConversionPipeline,
        renderers: RendererSet,
        default_format: DocumentFormat,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            renderers: Arc::new(renderers),
            default_format,
            limits: ConversionLimits::default(),
        }
    }

    /// Wires the production fetcher and renderers. Fails when PDF output is
    /// enabled and its font cannot be loaded.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let fetcher = Arc::new(ReaderFetcher::new(config.fetch.to_settings()));
        let pipeline = ConversionPipeline::new(fetcher, config.sanitize);

        let mut renderers = RendererSet::default()
            .with(Arc::new(EpubRenderer::new(config.epub.to_settings())))
            .with(Arc::new(FrontmatterHtmlRenderer));

        if config.pdf.enabled {
            let font = FontAsset::load(&config.pdf.font_path, config.pdf.font_family.clone())?;
            press_info!("Loaded PDF font {:?}", config.pdf.font_path);
            let launcher = Arc::new(ChromeLauncher::new(config.pdf.chrome_settings()));
            renderers = renderers.with(Arc::new(StyledPdfRenderer::new(
                launcher,
                font,
                config.pdf.to_settings(),
            )));
        } else {
            press_info!("PDF output disabled");
        }

        Ok(Self::new(pipeline, renderers, config.default_format))
    }
}

/// Conversion limits come from `config`; preflights and `/health` never wait on them.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let state = AppState {
        limits: ConversionLimits::from_config(config),
        ..state
    };

    Router::new()
        .route(
            "/",
            get(routes::convert_default).options(routes::preflight),
        )
        .route("/health", get(routes::health))
        .route(
            "/{format}",
            get(routes::convert_format).options(routes::preflight),
        )
        .with_state(state)
        .layer(cors_layer(&config.allowed_origins))
        .layer(middleware::map_response(preflight_no_content))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    press_warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .expose_headers([CONTENT_DISPOSITION])
}

/// CORS preflights answered by the CORS layer come back as `200`; report them as `204`.
async fn preflight_no_content(method: Method, response: Response) -> Response {
    if method != Method::OPTIONS || !response.status().is_success() {
        return response;
    }
    let (mut parts, _) = response.into_parts();
    parts.status = StatusCode::NO_CONTENT;
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::empty())
}
