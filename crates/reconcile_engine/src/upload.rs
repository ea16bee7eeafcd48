use std::time::Duration;

use reconcile_core::{FileHandle, ProcessedReport, RequestId, SyntheticProgress, UploadRequest};
use reconcile_logging::{reconcile_debug, reconcile_info, reconcile_warn};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::wire::parse_report_body;
use crate::{EngineEvent, FailureKind, UploadError, UploadResult};

/// Multipart field carrying the Crystal export.
pub const CRYSTAL_FIELD: &str = "file1";
/// Multipart field carrying the Query export.
pub const QUERY_FIELD: &str = "file2";
/// Multipart text field identifying the upload for `/cancel-process`.
pub const PROCESS_ID_FIELD: &str = "process_id";

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Deployment base; endpoint paths are resolved against it.
    pub base_url: Url,
    pub upload_path: String,
    pub cancel_path: String,
    pub connect_timeout: Duration,
    /// Hard limit for the whole exchange, body included.
    pub request_timeout: Duration,
    pub progress_interval: Duration,
    pub progress_ceiling: u8,
}

impl UploadSettings {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            upload_path: "upload".to_string(),
            cancel_path: "cancel-process".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            progress_interval: Duration::from_millis(500),
            progress_ceiling: reconcile_core::DEFAULT_PROGRESS_CEILING,
        }
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, UploadError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| UploadError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// Submits both files. Emits synthetic progress into `sink` until the
    /// exchange ends; produces exactly one terminal result.
    async fn upload(
        &self,
        request_id: RequestId,
        request: &UploadRequest,
        process_id: &str,
        sink: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> UploadResult;

    /// Tells the server to stop working on `process_id`.
    async fn notify_cancel(&self, process_id: &str) -> Result<(), UploadError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUploader {
    settings: UploadSettings,
}

#[derive(Serialize)]
struct CancelRequest<'a> {
    process_id: &'a str,
}

#[derive(Deserialize)]
struct CancelResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl ReqwestUploader {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    fn build_client(&self) -> Result<reqwest::Client, UploadError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| UploadError::new(FailureKind::Network, err.to_string()))
    }

    async fn exchange(
        &self,
        request: &UploadRequest,
        process_id: &str,
    ) -> Result<ProcessedReport, UploadError> {
        let url = self.settings.endpoint(&self.settings.upload_path)?;
        let form = Form::new()
            .text(PROCESS_ID_FIELD, process_id.to_string())
            .part(CRYSTAL_FIELD, file_part(&request.crystal_file).await?)
            .part(QUERY_FIELD, file_part(&request.query_file).await?);

        let client = self.build_client()?;
        let response = client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        reconcile_debug!("Upload response status {}", status);
        let body = response.text().await.map_err(map_reqwest_error)?;
        parse_report_body(status.as_u16(), &body)
    }
}

#[async_trait::async_trait]
impl Uploader for ReqwestUploader {
    async fn upload(
        &self,
        request_id: RequestId,
        request: &UploadRequest,
        process_id: &str,
        sink: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> UploadResult {
        let exchange = self.exchange(request, process_id);
        tokio::pin!(exchange);

        let mut ticker = tokio::time::interval(self.settings.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; progress starts at zero.
        ticker.tick().await;
        let mut progress = SyntheticProgress::new(self.settings.progress_ceiling);

        // The ticker lives only inside this loop, so no tick can follow the outcome.
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    reconcile_info!("Upload {} aborted by cancellation", request_id);
                    return UploadResult::Cancelled;
                }
                result = &mut exchange => {
                    return match result {
                        Ok(report) => UploadResult::Success(report),
                        Err(err) => {
                            reconcile_warn!("Upload {} failed: {}", request_id, err);
                            UploadResult::Failed(err)
                        }
                    };
                }
                _ = ticker.tick() => {
                    sink.emit(EngineEvent::UploadProgress {
                        request_id,
                        percent: progress.advance(),
                    });
                }
            }
        }
    }

    async fn notify_cancel(&self, process_id: &str) -> Result<(), UploadError> {
        let url = self.settings.endpoint(&self.settings.cancel_path)?;
        let client = self.build_client()?;
        let response = client
            .post(url)
            .json(&CancelRequest { process_id })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;
        let ack: CancelResponse = serde_json::from_str(&body).map_err(|err| {
            UploadError::new(
                FailureKind::BadResponse,
                format!("cancel response is not JSON (http {status}): {err}"),
            )
        })?;

        if ack.success {
            Ok(())
        } else {
            Err(UploadError::new(
                FailureKind::ServerReported { status },
                ack.error
                    .unwrap_or_else(|| "the process could not be cancelled".to_string()),
            ))
        }
    }
}

async fn file_part(file: &FileHandle) -> Result<Part, UploadError> {
    let bytes = tokio::fs::read(file.path()).await.map_err(|err| {
        UploadError::new(
            FailureKind::FileRead,
            format!("could not read {}: {err}", file.name),
        )
    })?;
    let mime = match file.extension().as_deref() {
        Some("xls") => XLS_MIME,
        _ => XLSX_MIME,
    };
    Part::bytes(bytes)
        .file_name(file.name.clone())
        .mime_str(mime)
        .map_err(|err| UploadError::new(FailureKind::FileRead, err.to_string()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> UploadError {
    if err.is_timeout() {
        return UploadError::new(FailureKind::Timeout, err.to_string());
    }
    UploadError::new(FailureKind::Network, err.to_string())
}
