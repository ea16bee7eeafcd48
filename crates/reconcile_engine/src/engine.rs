use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use reconcile_core::{DownloadId, RequestId, UploadRequest};
use reconcile_logging::{reconcile_debug, reconcile_info, reconcile_warn};
use tokio_util::sync::CancellationToken;

use crate::download::{DownloadSettings, Downloader, ReqwestDownloader};
use crate::upload::{ChannelProgressSink, ReqwestUploader, UploadSettings, Uploader};
use crate::{EngineEvent, UploadResult};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub upload: UploadSettings,
    pub download_dir: PathBuf,
    /// Fixed for the lifetime of the engine.
    pub notify_server_on_cancel: bool,
}

impl EngineConfig {
    fn download_settings(&self) -> DownloadSettings {
        DownloadSettings {
            base_url: self.upload.base_url.clone(),
            download_dir: self.download_dir.clone(),
            connect_timeout: self.upload.connect_timeout,
            request_timeout: self.upload.request_timeout,
        }
    }
}

enum EngineCommand {
    Upload {
        request_id: RequestId,
        request: UploadRequest,
        process_id: String,
        token: CancellationToken,
    },
    NotifyCancel {
        request_id: RequestId,
        process_id: String,
    },
    Download {
        download_id: DownloadId,
        link: String,
        file_name: Option<String>,
    },
}

struct InFlight {
    token: CancellationToken,
    process_id: String,
}

type InFlightMap = Arc<Mutex<HashMap<RequestId, InFlight>>>;

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    in_flight: InFlightMap,
    notify_server_on_cancel: bool,
}

impl EngineHandle {
    /// Starts the engine thread and its tokio runtime.
    pub fn new(config: EngineConfig) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let uploader = Arc::new(ReqwestUploader::new(config.upload.clone()));
        let downloader = Arc::new(ReqwestDownloader::new(config.download_settings()));
        let in_flight: InFlightMap = Arc::new(Mutex::new(HashMap::new()));
        let task_in_flight = in_flight.clone();

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let ctx = CommandContext {
                    uploader: uploader.clone(),
                    downloader: downloader.clone(),
                    in_flight: task_in_flight.clone(),
                    event_tx: event_tx.clone(),
                };
                runtime.spawn(async move {
                    handle_command(ctx, command).await;
                });
            }
            reconcile_debug!("Engine command channel closed");
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            in_flight,
            notify_server_on_cancel: config.notify_server_on_cancel,
        })
    }

    pub fn upload(&self, request_id: RequestId, request: UploadRequest, process_id: String) {
        // Registered before the command is queued so an immediate cancel finds it.
        let token = CancellationToken::new();
        if let Ok(mut map) = self.in_flight.lock() {
            map.insert(
                request_id,
                InFlight {
                    token: token.clone(),
                    process_id: process_id.clone(),
                },
            );
        }
        let _ = self.cmd_tx.send(EngineCommand::Upload {
            request_id,
            request,
            process_id,
            token,
        });
    }

    /// Aborts the request now; the server is told afterwards if configured.
    pub fn cancel(&self, request_id: RequestId) {
        let entry = self
            .in_flight
            .lock()
            .ok()
            .and_then(|mut map| map.remove(&request_id));
        let Some(in_flight) = entry else {
            reconcile_debug!("Cancel for request {} arrived after completion", request_id);
            return;
        };
        in_flight.token.cancel();
        if self.notify_server_on_cancel {
            let _ = self.cmd_tx.send(EngineCommand::NotifyCancel {
                request_id,
                process_id: in_flight.process_id,
            });
        }
    }

    pub fn download(&self, download_id: DownloadId, link: String, file_name: Option<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Download {
            download_id,
            link,
            file_name,
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

struct CommandContext {
    uploader: Arc<ReqwestUploader>,
    downloader: Arc<ReqwestDownloader>,
    in_flight: InFlightMap,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl CommandContext {
    fn forget(&self, request_id: RequestId) {
        if let Ok(mut map) = self.in_flight.lock() {
            map.remove(&request_id);
        }
    }
}

async fn handle_command(ctx: CommandContext, command: EngineCommand) {
    match command {
        EngineCommand::Upload {
            request_id,
            request,
            process_id,
            token,
        } => {
            let sink = ChannelProgressSink::new(ctx.event_tx.clone());
            let result = ctx
                .uploader
                .upload(request_id, &request, &process_id, &sink, token)
                .await;
            ctx.forget(request_id);
            let result = match result {
                UploadResult::Success(report) => Ok(report),
                UploadResult::Failed(err) => Err(err),
                UploadResult::Cancelled => return,
            };
            let _ = ctx.event_tx.send(EngineEvent::UploadCompleted { request_id, result });
        }
        EngineCommand::NotifyCancel {
            request_id,
            process_id,
        } => {
            reconcile_info!("Notifying server of cancellation for process {}", process_id);
            let result = ctx.uploader.notify_cancel(&process_id).await;
            if let Err(err) = &result {
                reconcile_warn!("Cancel notification failed: {}", err);
            }
            let _ = ctx
                .event_tx
                .send(EngineEvent::CancelAcknowledged { request_id, result });
        }
        EngineCommand::Download {
            download_id,
            link,
            file_name,
        } => {
            let sink = ChannelProgressSink::new(ctx.event_tx.clone());
            let result = ctx
                .downloader
                .download(download_id, &link, file_name.as_deref(), &sink)
                .await;
            if let Err(err) = &result {
                reconcile_warn!("Download {} failed: {}", download_id, err);
            }
            let _ = ctx
                .event_tx
                .send(EngineEvent::DownloadCompleted { download_id, result });
        }
    }
}
