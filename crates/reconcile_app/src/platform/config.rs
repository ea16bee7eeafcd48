//! RON configuration file plus command-line overrides.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use reconcile_core::ValidationLimits;
use reconcile_engine::{EngineConfig, UploadSettings};
use reconcile_logging::LogDestination;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "reconcile.ron";
const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Parser)]
#[command(
    name = "reconcile",
    about = "Upload Crystal and Query exports and browse the reconciliation report"
)]
pub struct Cli {
    /// RON configuration file; a missing file means defaults
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Base URL of the processing server
    #[arg(long, env = "RECONCILE_BASE_URL")]
    pub base_url: Option<String>,

    /// Reject files larger than this many MiB
    #[arg(long)]
    pub max_file_mb: Option<u64>,

    /// Log destination: file, terminal or both
    #[arg(long)]
    pub log: Option<String>,

    /// Crystal export to preselect
    #[arg(long)]
    pub crystal: Option<PathBuf>,

    /// Query export to preselect
    #[arg(long)]
    pub query: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("unknown log destination {0:?} (expected file, terminal or both)")]
    InvalidLogDestination(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub upload_path: String,
    pub cancel_path: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub progress_interval_ms: u64,
    pub progress_ceiling: u8,
    pub progress_grace_ms: u64,
    pub max_file_bytes: Option<u64>,
    pub notify_server_on_cancel: bool,
    pub download_dir: PathBuf,
    pub log_destination: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:10000/".to_string(),
            upload_path: "upload".to_string(),
            cancel_path: "cancel-process".to_string(),
            request_timeout_secs: 300,
            connect_timeout_secs: 10,
            progress_interval_ms: 500,
            progress_ceiling: reconcile_core::DEFAULT_PROGRESS_CEILING,
            progress_grace_ms: 1500,
            max_file_bytes: None,
            notify_server_on_cancel: true,
            download_dir: PathBuf::from("downloads"),
            log_destination: "file".to_string(),
        }
    }
}

impl Config {
    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the file named by `cli` and applies its overrides.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::load(&cli.config)?;
        if let Some(base_url) = &cli.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(mb) = cli.max_file_mb {
            config.max_file_bytes = Some(mb.saturating_mul(BYTES_PER_MB));
        }
        if let Some(log) = &cli.log {
            config.log_destination = log.clone();
        }
        Ok(config)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(self.base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        Ok(url)
    }

    pub fn log_destination(&self) -> Result<LogDestination, ConfigError> {
        LogDestination::parse(&self.log_destination)
            .ok_or_else(|| ConfigError::InvalidLogDestination(self.log_destination.clone()))
    }

    pub fn validation_limits(&self) -> ValidationLimits {
        ValidationLimits {
            max_file_bytes: self.max_file_bytes,
        }
    }

    pub fn progress_grace(&self) -> Duration {
        Duration::from_millis(self.progress_grace_ms)
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut upload = UploadSettings::new(self.base_url()?);
        upload.upload_path = self.upload_path.clone();
        upload.cancel_path = self.cancel_path.clone();
        upload.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        upload.request_timeout = Duration::from_secs(self.request_timeout_secs);
        upload.progress_interval = Duration::from_millis(self.progress_interval_ms.max(1));
        upload.progress_ceiling = self.progress_ceiling;
        Ok(EngineConfig {
            upload,
            download_dir: self.download_dir.clone(),
            notify_server_on_cancel: self.notify_server_on_cancel,
        })
    }
}
