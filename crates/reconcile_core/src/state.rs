use crate::view_model::{
    AppViewModel, DownloadAffordance, DownloadView, FilteredView, GlobalView, ProgressStatus,
    ProgressView, QueryValidationView, SelectionView, SessionState,
};
use crate::{
    filter_list, title_case, EntityKind, ErrorKind, FileHandle, Notice, ProcessedReport,
    QueryValidation, ValidationLimits,
};

pub type RequestId = u64;
pub type DownloadId = u64;

/// Terminal result of one upload, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success(ProcessedReport),
    Failure(UploadFailure),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// Column headers the server found, when it could not map them.
    pub crystal_columns: Vec<String>,
    pub query_columns: Vec<String>,
}

impl UploadFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            crystal_columns: Vec::new(),
            query_columns: Vec::new(),
        }
    }

    /// Message plus any column listings, one per line.
    pub fn describe(&self) -> String {
        let mut text = self.message.clone();
        for (label, columns) in [
            ("Crystal", &self.crystal_columns),
            ("Query", &self.query_columns),
        ] {
            if !columns.is_empty() {
                text.push_str(&format!("\nColumns in {label} file:"));
                for column in columns {
                    text.push_str("\n- ");
                    text.push_str(column);
                }
            }
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum Screen {
    #[default]
    Empty,
    Global,
    Filtered {
        kind: EntityKind,
        key: String,
    },
    QueryValidation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProgressSlot {
    request_id: RequestId,
    view: ProgressView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DownloadSlot {
    download_id: DownloadId,
    label: String,
    bytes: u64,
}

/// The whole session. Created once, replaced wholesale by [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    limits: ValidationLimits,
    crystal: Option<FileHandle>,
    query: Option<FileHandle>,
    session: SessionState,
    in_flight: Option<RequestId>,
    next_request_id: RequestId,
    progress: Option<ProgressSlot>,
    report: Option<ProcessedReport>,
    screen: Screen,
    selection: SelectionView,
    download: Option<DownloadSlot>,
    next_download_id: DownloadId,
    notices: Vec<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ValidationLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let (mut global, mut filtered, mut query_validation) = (None, None, None);
        match (&self.screen, &self.report) {
            (Screen::Global, Some(report)) => global = Some(global_view(report)),
            (Screen::Filtered { kind, key }, Some(report)) => {
                filtered = filtered_view(report, *kind, key);
            }
            (Screen::QueryValidation, Some(report)) => {
                query_validation = report.query_validation.as_ref().map(query_validation_view);
            }
            _ => {}
        }

        AppViewModel {
            session: self.session,
            crystal_file: self.crystal.as_ref().map(|f| f.name.clone()),
            query_file: self.query.as_ref().map(|f| f.name.clone()),
            can_upload: self.in_flight.is_none() && self.crystal.is_some() && self.query.is_some(),
            can_cancel: self.in_flight.is_some(),
            progress: self.progress.as_ref().map(|slot| slot.view),
            global,
            filtered,
            query_validation,
            selection: self.selection.clone(),
            download: self.download.as_ref().map(|slot| DownloadView {
                download_id: slot.download_id,
                label: slot.label.clone(),
                bytes: slot.bytes,
            }),
            notices: self.notices.clone(),
            dirty: self.dirty,
        }
    }

    pub fn report(&self) -> Option<&ProcessedReport> {
        self.report.as_ref()
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn limits(&self) -> ValidationLimits {
        self.limits
    }

    pub(crate) fn files(&self) -> (Option<&FileHandle>, Option<&FileHandle>) {
        (self.crystal.as_ref(), self.query.as_ref())
    }

    pub(crate) fn set_crystal(&mut self, file: Option<FileHandle>) {
        self.crystal = file;
        self.mark_dirty();
    }

    pub(crate) fn set_query(&mut self, file: Option<FileHandle>) {
        self.query = file;
        self.mark_dirty();
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
        self.mark_dirty();
    }

    pub(crate) fn clear_notices(&mut self) {
        if !self.notices.is_empty() {
            self.notices.clear();
            self.mark_dirty();
        }
    }

    /// Moves to `Submitting` and resets progress to zero.
    pub(crate) fn begin_upload(&mut self) -> RequestId {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.in_flight = Some(request_id);
        self.session = SessionState::Submitting;
        self.progress = Some(ProgressSlot {
            request_id,
            view: ProgressView {
                percent: 0,
                status: ProgressStatus::Running,
            },
        });
        self.mark_dirty();
        request_id
    }

    /// Leaves `Submitting`. Returns false if `request_id` is not the in-flight request.
    pub(crate) fn end_upload(
        &mut self,
        request_id: RequestId,
        session: SessionState,
        status: ProgressStatus,
    ) -> bool {
        if self.in_flight != Some(request_id) {
            return false;
        }
        self.in_flight = None;
        self.session = session;
        if let Some(slot) = self.progress.as_mut() {
            slot.view.status = status;
            if status == ProgressStatus::Completed {
                slot.view.percent = 100;
            }
        }
        self.mark_dirty();
        true
    }

    /// Applies a synthetic tick. Progress never moves backwards or reaches 100 here.
    pub(crate) fn apply_progress(&mut self, request_id: RequestId, percent: u8) {
        if self.in_flight != Some(request_id) {
            return;
        }
        if let Some(slot) = self.progress.as_mut() {
            let next = percent.min(99).max(slot.view.percent);
            if next != slot.view.percent {
                slot.view.percent = next;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn expire_progress(&mut self, request_id: RequestId) {
        let expired = self.progress.as_ref().is_some_and(|slot| {
            slot.request_id == request_id && slot.view.status != ProgressStatus::Running
        });
        if expired {
            self.progress = None;
            self.mark_dirty();
        }
    }

    /// Replaces the report wholesale and shows the global view.
    pub(crate) fn install_report(&mut self, report: ProcessedReport) {
        self.report = Some(report);
        self.show_global();
    }

    pub(crate) fn show_global(&mut self) {
        self.screen = Screen::Global;
        self.selection = SelectionView::default();
        self.mark_dirty();
    }

    pub(crate) fn show_filtered(&mut self, kind: EntityKind, key: String) {
        self.screen = Screen::Filtered { kind, key };
        self.mark_dirty();
    }

    pub(crate) fn show_query_validation(&mut self) {
        self.screen = Screen::QueryValidation;
        self.mark_dirty();
    }

    pub(crate) fn screen(&self) -> &Screen {
        &self.screen
    }

    pub(crate) fn selection(&self) -> &SelectionView {
        &self.selection
    }

    pub(crate) fn select_professional(&mut self, name: Option<String>) {
        self.selection.professional = name.filter(|n| !n.is_empty());
        self.mark_dirty();
    }

    pub(crate) fn select_user(&mut self, name: Option<String>) {
        self.selection.user = name.filter(|n| !n.is_empty());
        self.mark_dirty();
    }

    pub(crate) fn download_in_flight(&self) -> bool {
        self.download.is_some()
    }

    pub(crate) fn begin_download(&mut self, label: String) -> DownloadId {
        self.next_download_id += 1;
        let download_id = self.next_download_id;
        self.download = Some(DownloadSlot {
            download_id,
            label,
            bytes: 0,
        });
        self.mark_dirty();
        download_id
    }

    pub(crate) fn apply_download_progress(&mut self, download_id: DownloadId, bytes: u64) {
        if let Some(slot) = self.download.as_mut() {
            if slot.download_id == download_id && slot.bytes != bytes {
                slot.bytes = bytes;
                self.dirty = true;
            }
        }
    }

    /// Returns false if `download_id` is not the active download.
    pub(crate) fn end_download(&mut self, download_id: DownloadId) -> bool {
        match &self.download {
            Some(slot) if slot.download_id == download_id => {
                self.download = None;
                self.mark_dirty();
                true
            }
            _ => false,
        }
    }
}

fn global_view(report: &ProcessedReport) -> GlobalView {
    let totals = &report.totals;
    GlobalView {
        total_services_crystal: totals.total_services_crystal,
        total_services_query: totals.total_services_query,
        num_professionals: totals.num_professionals,
        num_users: totals.num_users,
        services_by_category: totals.services_by_category.clone(),
        professionals: filter_list(&report.professionals),
        users: filter_list(&report.users),
    }
}

fn filtered_view(report: &ProcessedReport, kind: EntityKind, key: &str) -> Option<FilteredView> {
    let entity = report.entity(kind, key)?;
    Some(FilteredView {
        kind,
        key: key.to_string(),
        title: format!("{} ({})", title_case(key), kind.source_label()),
        total_services: entity.total_services,
        total_users: entity.total_users,
        download: entity.download_link.as_ref().map(|link| DownloadAffordance {
            link: link.clone(),
            file_name: entity.file_name.clone(),
        }),
        services_by_category: entity.services_by_category.clone(),
        detailed_services: entity.detailed_services.clone(),
    })
}

fn query_validation_view(summary: &QueryValidation) -> QueryValidationView {
    QueryValidationView {
        total_users: summary.total_users,
        users_in_crystal: summary.users_in_crystal,
        users_only_in_query: summary.users_only_in_query,
        download: summary.download_link.as_ref().map(|link| DownloadAffordance {
            link: link.clone(),
            file_name: summary.file_name.clone(),
        }),
    }
}
