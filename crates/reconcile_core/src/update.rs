use reconcile_logging::{reconcile_debug, reconcile_info};

use crate::state::Screen;
use crate::view_model::{ProgressStatus, SessionState};
use crate::{
    title_case, validate, AppState, Effect, EntityKind, ErrorKind, Msg, Notice, UploadOutcome,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::CrystalChosen(file) => {
            state.set_crystal(file);
            Vec::new()
        }
        Msg::QueryChosen(file) => {
            state.set_query(file);
            Vec::new()
        }
        Msg::UploadClicked => start_upload(&mut state),
        Msg::CancelClicked => match state.in_flight() {
            Some(request_id) => {
                state.end_upload(request_id, SessionState::Cancelled, ProgressStatus::Cancelled);
                state.push_notice(Notice::warning(None, "Upload cancelled by user."));
                reconcile_info!("Upload {} cancelled by user", request_id);
                vec![
                    Effect::CancelUpload { request_id },
                    Effect::ScheduleProgressTeardown { request_id },
                ]
            }
            None => {
                reconcile_debug!("Cancel ignored: nothing in flight");
                Vec::new()
            }
        },
        Msg::UploadProgress {
            request_id,
            percent,
        } => {
            state.apply_progress(request_id, percent);
            Vec::new()
        }
        Msg::UploadFinished {
            request_id,
            outcome,
        } => finish_upload(&mut state, request_id, outcome),
        Msg::CancelAcknowledged { request_id, result } => {
            let notice = match result {
                Ok(()) => Notice::info("Server confirmed the cancellation."),
                Err(message) => Notice::warning(
                    None,
                    format!("Server could not cancel the process: {message}"),
                ),
            };
            reconcile_debug!("Cancel acknowledgement for request {}", request_id);
            state.push_notice(notice);
            Vec::new()
        }
        Msg::ProgressExpired { request_id } => {
            state.expire_progress(request_id);
            Vec::new()
        }
        Msg::ProfessionalSelected(name) => {
            state.select_professional(name);
            Vec::new()
        }
        Msg::UserSelected(name) => {
            state.select_user(name);
            Vec::new()
        }
        Msg::SearchClicked => {
            search(&mut state);
            Vec::new()
        }
        Msg::BackClicked => {
            if state.report().is_some() {
                state.show_global();
            }
            Vec::new()
        }
        Msg::DownloadClicked => start_download(&mut state),
        Msg::DownloadProgress { download_id, bytes } => {
            state.apply_download_progress(download_id, bytes);
            Vec::new()
        }
        Msg::DownloadFinished {
            download_id,
            result,
        } => {
            if state.end_download(download_id) {
                let notice = match result {
                    Ok(path) => Notice::success(format!("Download saved to {}", path.display())),
                    Err(message) => Notice::error(
                        ErrorKind::TransportError,
                        format!("Download failed: {message}"),
                    ),
                };
                state.push_notice(notice);
            }
            Vec::new()
        }
        Msg::NoticesAcknowledged => {
            state.clear_notices();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_upload(state: &mut AppState) -> Vec<Effect> {
    if state.in_flight().is_some() {
        state.push_notice(Notice::warning(
            Some(ErrorKind::AlreadyProcessing),
            "An upload is already being processed.",
        ));
        return Vec::new();
    }

    let (crystal, query) = state.files();
    let request = match validate(crystal, query, state.limits()) {
        Ok(request) => request,
        Err(err) => {
            reconcile_debug!("Upload rejected: {}", err);
            state.push_notice(Notice::error(err.kind(), err.to_string()));
            return Vec::new();
        }
    };

    let request_id = state.begin_upload();
    reconcile_info!(
        "Upload {} accepted: crystal={} ({} B) query={} ({} B)",
        request_id,
        request.crystal_file.name,
        request.crystal_file.size_bytes,
        request.query_file.name,
        request.query_file.size_bytes
    );
    vec![Effect::StartUpload {
        request_id,
        request,
    }]
}

fn finish_upload(
    state: &mut AppState,
    request_id: crate::RequestId,
    outcome: UploadOutcome,
) -> Vec<Effect> {
    let (session, status) = match &outcome {
        UploadOutcome::Success(_) => (SessionState::Succeeded, ProgressStatus::Completed),
        UploadOutcome::Failure(_) => (SessionState::Failed, ProgressStatus::Failed),
        UploadOutcome::Cancelled => (SessionState::Cancelled, ProgressStatus::Cancelled),
    };
    if !state.end_upload(request_id, session, status) {
        reconcile_debug!("Discarding stale outcome for request {}", request_id);
        return Vec::new();
    }

    match outcome {
        UploadOutcome::Success(report) => {
            reconcile_info!(
                "Upload {} succeeded: {} professionals, {} users",
                request_id,
                report.professionals.len(),
                report.users.len()
            );
            state.push_notice(Notice::success("Files processed successfully."));
            if let Some(mapping) = &report.column_mapping {
                state.push_notice(Notice::info(format!(
                    "Detected columns: {}, {}",
                    mapping.professional, mapping.service
                )));
            }
            if let Some(warning) = &report.warning {
                state.push_notice(Notice::warning(None, warning.clone()));
            }
            state.install_report(report);
        }
        UploadOutcome::Failure(failure) => {
            reconcile_info!("Upload {} failed ({}): {}", request_id, failure.kind, failure.message);
            state.push_notice(Notice::error(failure.kind, failure.describe()));
        }
        UploadOutcome::Cancelled => {
            state.push_notice(Notice::info("Process cancelled by the user."));
        }
    }

    vec![Effect::ScheduleProgressTeardown { request_id }]
}

fn search(state: &mut AppState) {
    if state.report().is_none() {
        state.push_notice(Notice::warning(
            Some(ErrorKind::NoReport),
            "Process the files first.",
        ));
        return;
    }

    let selection = state.selection().clone();
    let (kind, name) = match (selection.professional, selection.user) {
        (Some(_), Some(_)) => {
            state.push_notice(Notice::warning(
                Some(ErrorKind::AmbiguousSelection),
                "Select either a professional or a user, not both.",
            ));
            return;
        }
        (Some(name), None) => (EntityKind::Professional, name),
        (None, Some(name)) => (EntityKind::User, name),
        (None, None) => {
            let has_summary = state
                .report()
                .is_some_and(|report| report.query_validation.is_some());
            if has_summary {
                state.show_query_validation();
            } else {
                state.show_global();
            }
            return;
        }
    };

    let found = state
        .report()
        .is_some_and(|report| report.entity(kind, &name).is_some());
    if !found {
        state.push_notice(Notice::warning(
            Some(ErrorKind::NotFound),
            format!("No data found for {kind} {}.", title_case(&name)),
        ));
        return;
    }
    state.show_filtered(kind, name);
}

fn start_download(state: &mut AppState) -> Vec<Effect> {
    let (target, label) = match state.screen().clone() {
        Screen::Filtered { kind, key } => {
            let entity = state.report().and_then(|report| report.entity(kind, &key));
            let target = entity
                .and_then(|e| e.download_link.clone().map(|link| (link, e.file_name.clone())));
            (target, title_case(&key))
        }
        Screen::QueryValidation => {
            let summary = state.report().and_then(|report| report.query_validation.as_ref());
            let target = summary
                .and_then(|s| s.download_link.clone().map(|link| (link, s.file_name.clone())));
            (target, "the Query validation".to_string())
        }
        Screen::Empty | Screen::Global => {
            reconcile_debug!("Download ignored: no filtered view");
            return Vec::new();
        }
    };
    let Some((link, file_name)) = target else {
        state.push_notice(Notice::warning(
            Some(ErrorKind::NotFound),
            format!("No download is available for {label}."),
        ));
        return Vec::new();
    };

    if state.download_in_flight() {
        state.push_notice(Notice::warning(
            Some(ErrorKind::AlreadyProcessing),
            "A download is already running.",
        ));
        return Vec::new();
    }

    let label = file_name.clone().unwrap_or_else(|| link.clone());
    let download_id = state.begin_download(label);
    vec![Effect::StartDownload {
        download_id,
        link,
        file_name,
    }]
}
