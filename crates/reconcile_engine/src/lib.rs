//! Reconcile engine: HTTP exchanges, downloads and effect execution.
mod download;
mod engine;
mod filename;
mod persist;
mod types;
mod upload;
mod wire;

pub use download::{resolve_link, DownloadSettings, Downloader, ReqwestDownloader};
pub use engine::{EngineConfig, EngineHandle};
pub use filename::download_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use types::{DownloadError, EngineEvent, FailureKind, UploadError, UploadResult};
pub use upload::{
    ChannelProgressSink, ProgressSink, ReqwestUploader, UploadSettings, Uploader, CRYSTAL_FIELD,
    PROCESS_ID_FIELD, QUERY_FIELD,
};
pub use wire::parse_report_body;
