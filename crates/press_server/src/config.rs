//! Server configuration.
//!
//! Read from an optional RON file named by `PRESS_CONFIG`; every field has a
//! default, so a partial file (or none at all) is fine. `PRESS_BIND` overrides
//! the bind address.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use press_engine::render::{ChromeSettings, EpubSettings, PdfSettings};
use press_engine::{DocumentFormat, FetchSettings, SanitizeOptions, DEFAULT_EXTRACTION_BASE};
use press_logging::LogDestination;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "PRESS_CONFIG";
pub const BIND_ENV: &str = "PRESS_BIND";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Origins allowed by CORS; `"*"` allows any.
    pub allowed_origins: Vec<String>,
    /// Format served at `/`.
    pub default_format: DocumentFormat,
    pub request_timeout_secs: u64,
    /// Conversions running at once; further requests wait for a slot.
    pub max_concurrent_requests: usize,
    pub log_level: String,
    pub log_destination: LogDestination,
    pub log_file: PathBuf,
    pub fetch: FetchConfig,
    pub sanitize: SanitizeOptions,
    pub epub: EpubConfig,
    pub pdf: PdfConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            allowed_origins: vec![
                "https://url-to-kindle.web.app".to_string(),
                "https://url-to-kindle.hannes.cool".to_string(),
            ],
            default_format: DocumentFormat::Epub,
            request_timeout_secs: 60,
            max_concurrent_requests: 2,
            log_level: "info".to_string(),
            log_destination: LogDestination::Terminal,
            log_file: PathBuf::from("./press.log"),
            fetch: FetchConfig::default(),
            sanitize: SanitizeOptions::default(),
            epub: EpubConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub extraction_base: String,
    pub respond_with: String,
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            extraction_base: DEFAULT_EXTRACTION_BASE.to_string(),
            respond_with: defaults.respond_with,
            api_key: None,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            max_bytes: defaults.max_bytes,
        }
    }
}

impl FetchConfig {
    pub fn to_settings(&self) -> FetchSettings {
        FetchSettings {
            extraction_base: self.extraction_base.clone(),
            respond_with: self.respond_with.clone(),
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_bytes,
            ..FetchSettings::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpubConfig {
    pub language: String,
}

impl Default for EpubConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

impl EpubConfig {
    pub fn to_settings(&self) -> EpubSettings {
        EpubSettings {
            language: self.language.clone(),
            ..EpubSettings::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// When set, the font below must exist or startup fails.
    pub enabled: bool,
    pub font_path: PathBuf,
    pub font_family: String,
    pub chrome_executable: Option<PathBuf>,
    pub no_sandbox: bool,
    pub content_timeout_secs: u64,
    /// Characters of rendered text logged at debug level; `0` disables.
    pub preview_chars: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            font_path: PathBuf::from("assets/fonts/Literata-Regular.ttf"),
            font_family: "Literata".to_string(),
            chrome_executable: None,
            no_sandbox: false,
            content_timeout_secs: 30,
            preview_chars: 200,
        }
    }
}

impl PdfConfig {
    pub fn to_settings(&self) -> PdfSettings {
        PdfSettings {
            content_timeout: Duration::from_secs(self.content_timeout_secs),
            preview_chars: self.preview_chars,
            ..PdfSettings::default()
        }
    }

    pub fn chrome_settings(&self) -> ChromeSettings {
        ChromeSettings {
            executable: self.chrome_executable.clone(),
            no_sandbox: self.no_sandbox,
            ..ChromeSettings::default()
        }
    }
}

impl ServerConfig {
    /// Defaults, overlaid by the `PRESS_CONFIG` file and `PRESS_BIND`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Ok(bind) = env::var(BIND_ENV) {
            if !bind.trim().is_empty() {
                config.bind_addr = bind.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn from_ron(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
