use crate::{DownloadId, EntityKind, ListEntry, Notice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressView {
    pub percent: u8,
    pub status: ProgressStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionView {
    pub professional: Option<String>,
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalView {
    pub total_services_crystal: u64,
    pub total_services_query: u64,
    pub num_professionals: u64,
    pub num_users: u64,
    pub services_by_category: Vec<(String, u64)>,
    pub professionals: Vec<ListEntry>,
    pub users: Vec<ListEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadAffordance {
    pub link: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredView {
    pub kind: EntityKind,
    pub key: String,
    /// Display name plus source label, e.g. `Dr. Ana Ruiz (Crystal)`.
    pub title: String,
    pub total_services: Option<u64>,
    pub total_users: Option<u64>,
    pub download: Option<DownloadAffordance>,
    pub services_by_category: Vec<(String, u64)>,
    pub detailed_services: Vec<(String, u64)>,
}

/// Query-side user reconciliation, reached by searching with nothing selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryValidationView {
    pub total_users: u64,
    pub users_in_crystal: u64,
    pub users_only_in_query: u64,
    pub download: Option<DownloadAffordance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadView {
    pub download_id: DownloadId,
    pub label: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub crystal_file: Option<String>,
    pub query_file: Option<String>,
    /// Trigger enabled: both files chosen and nothing in flight.
    pub can_upload: bool,
    pub can_cancel: bool,
    pub progress: Option<ProgressView>,
    /// At most one of `global`, `filtered` and `query_validation` is set.
    pub global: Option<GlobalView>,
    pub filtered: Option<FilteredView>,
    pub query_validation: Option<QueryValidationView>,
    pub selection: SelectionView,
    pub download: Option<DownloadView>,
    pub notices: Vec<Notice>,
    pub dirty: bool,
}
