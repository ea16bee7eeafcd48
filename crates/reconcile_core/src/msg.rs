use std::path::PathBuf;

use crate::{DownloadId, FileHandle, RequestId, UploadOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked (or cleared) the Crystal export.
    CrystalChosen(Option<FileHandle>),
    /// User picked (or cleared) the Query export.
    QueryChosen(Option<FileHandle>),
    /// User pressed the process button.
    UploadClicked,
    /// User pressed cancel while an upload was in flight.
    CancelClicked,
    /// User changed the professional selection. `None` clears it.
    ProfessionalSelected(Option<String>),
    /// User changed the user selection. `None` clears it.
    UserSelected(Option<String>),
    /// User pressed search.
    SearchClicked,
    /// User pressed back in the filtered view.
    BackClicked,
    /// User asked for the current entity's file.
    DownloadClicked,
    /// User dismissed the visible notices.
    NoticesAcknowledged,
    /// Engine: synthetic progress for an in-flight upload.
    UploadProgress { request_id: RequestId, percent: u8 },
    /// Engine: the upload reached a terminal outcome.
    UploadFinished {
        request_id: RequestId,
        outcome: UploadOutcome,
    },
    /// Engine: the server answered a cancellation notice.
    CancelAcknowledged {
        request_id: RequestId,
        result: Result<(), String>,
    },
    /// Shell: the grace period after a terminal upload state has passed.
    ProgressExpired { request_id: RequestId },
    /// Engine: bytes received so far for a download.
    DownloadProgress { download_id: DownloadId, bytes: u64 },
    /// Engine: a download finished.
    DownloadFinished {
        download_id: DownloadId,
        result: Result<PathBuf, String>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for unrecognized input.
    NoOp,
}
