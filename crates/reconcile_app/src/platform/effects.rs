use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use reconcile_core::{Effect, ErrorKind, Msg, RequestId, UploadFailure, UploadOutcome};
use reconcile_engine::{EngineEvent, EngineHandle, FailureKind, UploadError};
use reconcile_logging::{reconcile_info, reconcile_warn};

/// Runs core effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    progress_grace: Duration,
    timer_tx: mpsc::Sender<Msg>,
    timer_rx: mpsc::Receiver<Msg>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, progress_grace: Duration) -> Self {
        let (timer_tx, timer_rx) = mpsc::channel();
        Self {
            engine,
            progress_grace,
            timer_tx,
            timer_rx,
        }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartUpload {
                    request_id,
                    request,
                } => {
                    let process_id = process_id_for(request_id);
                    reconcile_info!(
                        "StartUpload request_id={} process_id={} crystal={} query={}",
                        request_id,
                        process_id,
                        request.crystal_file.name,
                        request.query_file.name
                    );
                    self.engine.upload(request_id, request, process_id);
                }
                Effect::CancelUpload { request_id } => {
                    reconcile_info!("CancelUpload request_id={}", request_id);
                    self.engine.cancel(request_id);
                }
                Effect::ScheduleProgressTeardown { request_id } => {
                    let tx = self.timer_tx.clone();
                    let grace = self.progress_grace;
                    thread::spawn(move || {
                        thread::sleep(grace);
                        let _ = tx.send(Msg::ProgressExpired { request_id });
                    });
                }
                Effect::StartDownload {
                    download_id,
                    link,
                    file_name,
                } => {
                    reconcile_info!("StartDownload download_id={} link={}", download_id, link);
                    self.engine.download(download_id, link, file_name);
                }
            }
        }
    }

    /// Drains everything that arrived since the last call.
    pub fn poll(&self) -> Vec<Msg> {
        let mut inbox = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            inbox.push(map_event(event));
        }
        while let Ok(msg) = self.timer_rx.try_recv() {
            inbox.push(msg);
        }
        inbox
    }
}

/// Identifies the upload to the server for `/cancel-process`.
fn process_id_for(request_id: RequestId) -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), request_id)
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UploadProgress {
            request_id,
            percent,
        } => Msg::UploadProgress {
            request_id,
            percent,
        },
        EngineEvent::UploadCompleted { request_id, result } => {
            let outcome = match result {
                Ok(report) => UploadOutcome::Success(report),
                Err(err) if err.kind == FailureKind::ServerCancelled => UploadOutcome::Cancelled,
                Err(err) => UploadOutcome::Failure(map_failure(err)),
            };
            Msg::UploadFinished {
                request_id,
                outcome,
            }
        }
        EngineEvent::CancelAcknowledged { request_id, result } => Msg::CancelAcknowledged {
            request_id,
            result: result.map_err(|err| err.message),
        },
        EngineEvent::DownloadProgress { download_id, bytes } => {
            Msg::DownloadProgress { download_id, bytes }
        }
        EngineEvent::DownloadCompleted {
            download_id,
            result,
        } => {
            if let Err(err) = &result {
                reconcile_warn!("Download {} failed: {}", download_id, err);
            }
            Msg::DownloadFinished {
                download_id,
                result: result.map_err(|err| err.to_string()),
            }
        }
    }
}

fn map_failure(err: UploadError) -> UploadFailure {
    let mut failure = UploadFailure::new(map_kind(err.kind), err.message);
    failure.crystal_columns = err.crystal_columns;
    failure.query_columns = err.query_columns;
    failure
}

fn map_kind(kind: FailureKind) -> ErrorKind {
    match kind {
        FailureKind::FileRead => ErrorKind::FileUnreadable,
        FailureKind::InvalidUrl | FailureKind::Network => ErrorKind::TransportError,
        FailureKind::Timeout => ErrorKind::Timeout,
        FailureKind::BadResponse => ErrorKind::BadResponse,
        FailureKind::ServerReported { .. } | FailureKind::ServerCancelled => {
            ErrorKind::ServerReported
        }
    }
}
