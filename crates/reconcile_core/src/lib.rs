//! Reconcile core: pure upload/report state machine and view-model helpers.
mod effect;
mod msg;
mod notice;
mod progress;
mod report;
mod state;
mod text;
mod update;
mod validate;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use notice::{ErrorKind, Notice, Severity};
pub use progress::{SyntheticProgress, DEFAULT_PROGRESS_CEILING};
pub use report::{
    filter_list, ColumnMapping, EntityKind, EntityReport, ListEntry, ProcessedReport,
    QueryValidation, Totals,
};
pub use state::{AppState, DownloadId, RequestId, UploadFailure, UploadOutcome};
pub use text::title_case;
pub use update::update;
pub use validate::{
    validate, FileHandle, FileRole, UploadRequest, ValidationError, ValidationLimits,
    ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_BYTES,
};
pub use view_model::{
    AppViewModel, DownloadAffordance, DownloadView, FilteredView, GlobalView, ProgressStatus,
    ProgressView, QueryValidationView, SelectionView, SessionState,
};
