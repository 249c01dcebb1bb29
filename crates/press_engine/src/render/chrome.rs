use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures_util::StreamExt;
use press_logging::{press_debug, press_warn};
use tokio::task::JoinHandle;

use crate::error::RenderError;

use super::engine::{EngineLauncher, EngineSession, PdfPageOptions};

const MM_PER_INCH: f64 = 25.4;

/// Resolves once web fonts and every image have finished (or failed) loading.
/// `set_content` only waits for the document itself.
const SETTLE_SCRIPT: &str = r#"Promise.all([
  document.fonts ? document.fonts.ready : Promise.resolve(),
  ...Array.from(document.images)
    .filter((img) => !img.complete)
    .map((img) => new Promise((done) => { img.onload = done; img.onerror = done; })),
]).then(() => true)"#;

#[derive(Debug, Clone)]
pub struct ChromeSettings {
    /// Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    /// Needed inside most containers.
    pub no_sandbox: bool,
    pub extra_args: Vec<String>,
    /// Timeout for individual DevTools protocol requests.
    pub request_timeout: Duration,
}

impl Default for ChromeSettings {
    fn default() -> Self {
        Self {
            executable: None,
            no_sandbox: false,
            extra_args: vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--font-render-hinting=none".to_string(),
            ],
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Launches a fresh headless Chrome per render via the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    settings: ChromeSettings,
}

impl ChromeLauncher {
    pub fn new(settings: ChromeSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.settings.request_timeout)
            .args(self.settings.extra_args.iter().map(String::as_str));
        if let Some(executable) = &self.settings.executable {
            builder = builder.chrome_executable(executable);
        }
        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        builder.build().map_err(RenderError::EngineLaunch)
    }
}

#[async_trait::async_trait]
impl EngineLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn EngineSession>, RenderError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| RenderError::EngineLaunch(err.to_string()))?;

        // The handler stream must be polled for the browser to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    press_warn!("Closing browser after failed page open: {}", close_err);
                }
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(RenderError::EngineLaunch(err.to_string()));
            }
        };
        press_debug!("Headless browser launched");

        Ok(Box::new(ChromeSession {
            browser,
            page,
            handler_task: Some(handler_task),
        }))
    }
}

struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl EngineSession for ChromeSession {
    async fn load_html(&mut self, html: &str) -> Result<(), RenderError> {
        self.page
            .set_content(html)
            .await
            .map_err(|err| RenderError::Engine(err.to_string()))?;
        self.page
            .evaluate_expression(settle_params()?)
            .await
            .map_err(|err| RenderError::Engine(err.to_string()))?;
        Ok(())
    }

    async fn body_text(&mut self) -> Result<String, RenderError> {
        self.page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|err| RenderError::Engine(err.to_string()))?
            .into_value::<String>()
            .map_err(|err| RenderError::Engine(err.to_string()))
    }

    async fn print_pdf(&mut self, options: &PdfPageOptions) -> Result<Vec<u8>, RenderError> {
        self.page
            .pdf(print_params(options))
            .await
            .map_err(|err| RenderError::Engine(err.to_string()))
    }

    async fn close(mut self: Box<Self>) -> Result<(), RenderError> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|err| RenderError::Engine(err.to_string()));
        // Reap the child process even if the close command failed.
        if let Err(err) = self.browser.wait().await {
            press_warn!("Waiting for browser process failed: {}", err);
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        press_debug!("Headless browser closed");
        closed
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

fn settle_params() -> Result<EvaluateParams, RenderError> {
    EvaluateParams::builder()
        .expression(SETTLE_SCRIPT)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(RenderError::Engine)
}

fn print_params(options: &PdfPageOptions) -> PrintToPdfParams {
    PrintToPdfParams {
        print_background: Some(options.print_background),
        paper_width: Some(options.paper_width_mm / MM_PER_INCH),
        paper_height: Some(options.paper_height_mm / MM_PER_INCH),
        margin_top: Some(options.margin_top_mm / MM_PER_INCH),
        margin_bottom: Some(options.margin_bottom_mm / MM_PER_INCH),
        margin_left: Some(options.margin_left_mm / MM_PER_INCH),
        margin_right: Some(options.margin_right_mm / MM_PER_INCH),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}
