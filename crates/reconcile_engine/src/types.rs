use std::fmt;
use std::path::PathBuf;

use reconcile_core::{DownloadId, ProcessedReport, RequestId};

use crate::persist::PersistError;

#[derive(Debug)]
pub enum EngineEvent {
    UploadProgress {
        request_id: RequestId,
        percent: u8,
    },
    /// Never sent for an upload that was cancelled.
    UploadCompleted {
        request_id: RequestId,
        result: Result<ProcessedReport, UploadError>,
    },
    CancelAcknowledged {
        request_id: RequestId,
        result: Result<(), UploadError>,
    },
    DownloadProgress {
        download_id: DownloadId,
        bytes: u64,
    },
    DownloadCompleted {
        download_id: DownloadId,
        result: Result<PathBuf, DownloadError>,
    },
}

/// Terminal outcome of [`crate::Uploader::upload`]; exactly one per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Success(ProcessedReport),
    Failed(UploadError),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadError {
    pub kind: FailureKind,
    pub message: String,
    pub crystal_columns: Vec<String>,
    pub query_columns: Vec<String>,
}

impl UploadError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            crystal_columns: Vec::new(),
            query_columns: Vec::new(),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for UploadError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A chosen file could not be read from disk.
    FileRead,
    InvalidUrl,
    Timeout,
    /// Body was not JSON, or not the expected shape.
    BadResponse,
    /// The payload carried an `error` field, or the status was not 2xx.
    ServerReported { status: u16 },
    /// The server stopped the process on the user's request.
    ServerCancelled,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::FileRead => write!(f, "file read error"),
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::BadResponse => write!(f, "bad response"),
            FailureKind::ServerReported { status } => write!(f, "server error (http {status})"),
            FailureKind::ServerCancelled => write!(f, "cancelled by server"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid download link {link:?}: {reason}")]
    InvalidLink { link: String, reason: String },
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("could not save file: {0}")]
    Persist(#[from] PersistError),
}
