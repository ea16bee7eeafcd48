use crate::{DownloadId, RequestId, UploadRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartUpload {
        request_id: RequestId,
        request: UploadRequest,
    },
    /// Abort the in-flight request; its eventual response is discarded.
    CancelUpload { request_id: RequestId },
    /// Send `Msg::ProgressExpired` after the grace period.
    ScheduleProgressTeardown { request_id: RequestId },
    StartDownload {
        download_id: DownloadId,
        link: String,
        file_name: Option<String>,
    },
}
