use crate::error::RenderError;

/// Page geometry for a PDF print, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPageOptions {
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,
    pub margin_top_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    pub margin_right_mm: f64,
    pub print_background: bool,
}

impl Default for PdfPageOptions {
    /// A4 with 20mm top/bottom and 15mm left/right margins.
    fn default() -> Self {
        Self {
            paper_width_mm: 210.0,
            paper_height_mm: 297.0,
            margin_top_mm: 20.0,
            margin_bottom_mm: 20.0,
            margin_left_mm: 15.0,
            margin_right_mm: 15.0,
            print_background: true,
        }
    }
}

/// Starts a headless rendering engine. Each launch belongs to exactly one request.
#[async_trait::async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn EngineSession>, RenderError>;
}

/// One running engine with a single page open.
///
/// Callers must finish with [`EngineSession::close`] on every path, including
/// after an error from any other method.
#[async_trait::async_trait]
pub trait EngineSession: Send {
    /// Sets the page content and waits until the page has settled.
    async fn load_html(&mut self, html: &str) -> Result<(), RenderError>;

    /// Visible text of the rendered body.
    async fn body_text(&mut self) -> Result<String, RenderError>;

    async fn print_pdf(&mut self, options: &PdfPageOptions) -> Result<Vec<u8>, RenderError>;

    /// Tears the engine down and releases its process.
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}
