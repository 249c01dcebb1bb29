//! HTTP surface of the article press: one conversion endpoint per output format.
pub mod app;
pub mod config;
mod routes;

pub use app::{build_router, AppState, ConversionLimits, RendererSet, StartupError};
pub use config::{ConfigError, ServerConfig};
