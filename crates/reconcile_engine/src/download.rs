use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use reconcile_core::DownloadId;
use reconcile_logging::reconcile_info;
use url::Url;

use crate::filename::download_filename;
use crate::persist::AtomicFileWriter;
use crate::upload::ProgressSink;
use crate::{DownloadError, EngineEvent};

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Relative links are resolved against this.
    pub base_url: Url,
    pub download_dir: PathBuf,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Resolves a server-issued link, absolute or relative to `base`.
pub fn resolve_link(base: &Url, link: &str) -> Result<Url, DownloadError> {
    let invalid = |reason: String| DownloadError::InvalidLink {
        link: link.to_string(),
        reason,
    };
    match Url::parse(link) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.join(link).map_err(|err| invalid(err.to_string()))
        }
        Err(err) => Err(invalid(err.to_string())),
    }
}

#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    async fn download(
        &self,
        download_id: DownloadId,
        link: &str,
        file_name: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<PathBuf, DownloadError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDownloader {
    settings: DownloadSettings,
}

impl ReqwestDownloader {
    pub fn new(settings: DownloadSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, DownloadError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| DownloadError::Network(err.to_string()))
    }
}

#[async_trait::async_trait]
impl Downloader for ReqwestDownloader {
    async fn download(
        &self,
        download_id: DownloadId,
        link: &str,
        file_name: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<PathBuf, DownloadError> {
        let url = resolve_link(&self.settings.base_url, link)?;
        let client = self.build_client()?;

        let response = client.get(url.clone()).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus(status.as_u16()));
        }

        sink.emit(EngineEvent::DownloadProgress {
            download_id,
            bytes: 0,
        });

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            bytes.extend_from_slice(&chunk);
            sink.emit(EngineEvent::DownloadProgress {
                download_id,
                bytes: bytes.len() as u64,
            });
        }

        let name = download_filename(file_name, &url);
        let writer = AtomicFileWriter::new(self.settings.download_dir.clone());
        let path = writer.write(&name, &bytes)?;
        reconcile_info!(
            "Download {} saved {} bytes to {:?}",
            download_id,
            bytes.len(),
            path
        );
        Ok(path)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> DownloadError {
    if err.is_timeout() {
        return DownloadError::Timeout;
    }
    DownloadError::Network(err.to_string())
}
