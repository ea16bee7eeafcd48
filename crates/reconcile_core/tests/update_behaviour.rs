mod common;

use common::{init_logging, sample_report, start_upload, xlsx};
use reconcile_core::{
    update, AppState, Effect, ErrorKind, FileHandle, Msg, ProgressStatus, SessionState, Severity,
    UploadFailure, UploadOutcome, ValidationLimits,
};

#[test]
fn upload_without_files_is_rejected_without_effects() {
    init_logging();
    let (mut state, effects) = update(AppState::new(), Msg::UploadClicked);

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.session, SessionState::Idle);
    assert_eq!(view.notices.len(), 1);
    assert_eq!(view.notices[0].kind, Some(ErrorKind::MissingFile));
    assert!(view.progress.is_none());
    assert!(state.consume_dirty());
}

#[test]
fn upload_with_wrong_extension_is_rejected() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::CrystalChosen(Some(xlsx("a.xlsx"))));
    let (state, _) = update(
        state,
        Msg::QueryChosen(Some(FileHandle::new("/data/query.csv", 10))),
    );
    let (state, effects) = update(state, Msg::UploadClicked);

    assert!(effects.is_empty());
    assert_eq!(state.view().notices[0].kind, Some(ErrorKind::InvalidExtension));
    assert!(state.view().can_upload);
}

#[test]
fn configured_ceiling_rejects_large_files() {
    init_logging();
    let state = AppState::with_limits(ValidationLimits {
        max_file_bytes: Some(1024),
    });
    let (state, _) = update(state, Msg::CrystalChosen(Some(xlsx("a.xlsx"))));
    let (state, _) = update(state, Msg::QueryChosen(Some(xlsx("b.xlsx"))));
    let (state, effects) = update(state, Msg::UploadClicked);

    assert!(effects.is_empty());
    assert_eq!(state.view().notices[0].kind, Some(ErrorKind::FileTooLarge));
}

#[test]
fn valid_upload_enters_submitting_and_emits_start() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::CrystalChosen(Some(xlsx("c.xlsx"))));
    let (state, _) = update(state, Msg::QueryChosen(Some(xlsx("q.xls"))));
    assert!(state.view().can_upload);
    assert!(!state.view().can_cancel);

    let (state, effects) = update(state, Msg::UploadClicked);
    let view = state.view();

    assert_eq!(view.session, SessionState::Submitting);
    assert!(!view.can_upload);
    assert!(view.can_cancel);
    assert_eq!(view.progress.map(|p| p.percent), Some(0));
    assert_eq!(effects.len(), 1);
    match &effects[0] {
        Effect::StartUpload {
            request_id,
            request,
        } => {
            assert_eq!(*request_id, 1);
            assert_eq!(request.crystal_file.name, "c.xlsx");
            assert_eq!(request.query_file.name, "q.xls");
        }
        other => panic!("unexpected effect {other:?}"),
    }
}

#[test]
fn second_upload_while_in_flight_is_rejected() {
    init_logging();
    let (state, request_id) = start_upload(AppState::new());
    let (state, effects) = update(state, Msg::UploadClicked);

    assert!(effects.is_empty());
    assert_eq!(state.in_flight(), Some(request_id));
    let view = state.view();
    assert_eq!(view.session, SessionState::Submitting);
    assert_eq!(
        view.notices.last().and_then(|n| n.kind),
        Some(ErrorKind::AlreadyProcessing)
    );
}

#[test]
fn progress_is_monotonic_and_capped_below_completion() {
    init_logging();
    let (state, request_id) = start_upload(AppState::new());
    let (state, _) = update(
        state,
        Msg::UploadProgress {
            request_id,
            percent: 40,
        },
    );
    let (state, _) = update(
        state,
        Msg::UploadProgress {
            request_id,
            percent: 20,
        },
    );
    assert_eq!(state.view().progress.map(|p| p.percent), Some(40));

    let (state, _) = update(
        state,
        Msg::UploadProgress {
            request_id,
            percent: 100,
        },
    );
    assert_eq!(state.view().progress.map(|p| p.percent), Some(99));
}

#[test]
fn success_snaps_progress_and_schedules_teardown() {
    init_logging();
    let (state, request_id) = start_upload(AppState::new());
    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            request_id,
            outcome: UploadOutcome::Success(sample_report()),
        },
    );

    assert_eq!(effects, vec![Effect::ScheduleProgressTeardown { request_id }]);
    let view = state.view();
    assert_eq!(view.session, SessionState::Succeeded);
    assert!(view.can_upload);
    assert!(!view.can_cancel);
    let progress = view.progress.expect("progress visible during grace period");
    assert_eq!(progress.percent, 100);
    assert_eq!(progress.status, ProgressStatus::Completed);
    assert_eq!(view.global.expect("global view").total_services_crystal, 120);
    assert_eq!(view.notices[0].severity, Severity::Success);

    // Ticks arriving after completion change nothing.
    let (mut state, _) = update(state, Msg::NoticesAcknowledged);
    state.consume_dirty();
    let (mut state, _) = update(
        state,
        Msg::UploadProgress {
            request_id,
            percent: 50,
        },
    );
    assert!(!state.consume_dirty());
    assert_eq!(state.view().progress.map(|p| p.percent), Some(100));

    let (state, _) = update(state, Msg::ProgressExpired { request_id });
    assert!(state.view().progress.is_none());
}

#[test]
fn cancel_is_terminal_and_later_outcome_is_discarded() {
    init_logging();
    let (state, request_id) = start_upload(AppState::new());
    let (state, effects) = update(state, Msg::CancelClicked);

    assert_eq!(
        effects,
        vec![
            Effect::CancelUpload { request_id },
            Effect::ScheduleProgressTeardown { request_id },
        ]
    );
    let view = state.view();
    assert_eq!(view.session, SessionState::Cancelled);
    assert!(view.can_upload);
    assert_eq!(
        view.progress.map(|p| p.status),
        Some(ProgressStatus::Cancelled)
    );
    let notices_after_cancel = view.notices.len();

    // The network response arrives anyway.
    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            request_id,
            outcome: UploadOutcome::Success(sample_report()),
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.session, SessionState::Cancelled);
    assert!(view.global.is_none());
    assert!(state.report().is_none());
    assert_eq!(view.notices.len(), notices_after_cancel);

    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            request_id,
            outcome: UploadOutcome::Failure(UploadFailure::new(ErrorKind::Timeout, "late")),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().notices.len(), notices_after_cancel);
}

#[test]
fn cancel_without_upload_is_noop() {
    init_logging();
    let (mut state, effects) = update(AppState::new(), Msg::CancelClicked);
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
}

#[test]
fn failure_keeps_previous_report_and_lists_columns() {
    init_logging();
    let state = common::loaded_state();
    let before = state.view().global.clone();

    let (state, request_id) = start_upload(state);
    let mut failure = UploadFailure::new(ErrorKind::ServerReported, "Missing column 'Profesional'");
    failure.crystal_columns = vec!["Fecha".to_string(), "Servicio".to_string()];
    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            request_id,
            outcome: UploadOutcome::Failure(failure),
        },
    );

    assert_eq!(effects, vec![Effect::ScheduleProgressTeardown { request_id }]);
    let view = state.view();
    assert_eq!(view.session, SessionState::Failed);
    assert_eq!(view.global, before);
    let notice = view.notices.last().expect("failure notice");
    assert_eq!(notice.severity, Severity::Error);
    assert_eq!(notice.kind, Some(ErrorKind::ServerReported));
    assert!(notice.message.contains("Missing column 'Profesional'"));
    assert!(notice.message.contains("Columns in Crystal file:\n- Fecha\n- Servicio"));
}

#[test]
fn new_success_replaces_report_wholesale() {
    init_logging();
    let state = common::loaded_state();
    let (state, request_id) = start_upload(state);
    let mut replacement = sample_report();
    replacement.professionals = vec!["zoe".to_string()];
    replacement.professional_data.clear();
    replacement.totals.total_services_crystal = 7;

    let (state, _) = update(
        state,
        Msg::UploadFinished {
            request_id,
            outcome: UploadOutcome::Success(replacement),
        },
    );
    let global = state.view().global.expect("global view");
    assert_eq!(global.total_services_crystal, 7);
    let names: Vec<_> = global.professionals.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(names, vec!["zoe"]);
    assert_eq!(state.in_flight(), None);
    assert_eq!(request_id, 2);
}

#[test]
fn partial_failure_renders_data_and_warns() {
    init_logging();
    let (state, request_id) = start_upload(AppState::new());
    let mut report = sample_report();
    report.warning = Some("3 rows skipped".to_string());
    let (state, _) = update(
        state,
        Msg::UploadFinished {
            request_id,
            outcome: UploadOutcome::Success(report),
        },
    );

    let view = state.view();
    assert!(view.global.is_some());
    assert!(view
        .notices
        .iter()
        .any(|n| n.severity == Severity::Warning && n.message == "3 rows skipped"));
}

#[test]
fn cancel_acknowledgement_is_surfaced_without_changing_state() {
    init_logging();
    let (state, request_id) = start_upload(AppState::new());
    let (state, _) = update(state, Msg::CancelClicked);
    let (state, _) = update(state, Msg::NoticesAcknowledged);
    let (state, effects) = update(
        state,
        Msg::CancelAcknowledged {
            request_id,
            result: Err("unknown process".to_string()),
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.session, SessionState::Cancelled);
    assert_eq!(view.notices.len(), 1);
    assert_eq!(view.notices[0].severity, Severity::Warning);
    assert!(view.notices[0].message.contains("unknown process"));
}

#[test]
fn stale_teardown_does_not_hide_a_newer_upload() {
    init_logging();
    let (state, first) = start_upload(AppState::new());
    let (state, _) = update(state, Msg::CancelClicked);
    let (state, second) = {
        let (state, effects) = update(state, Msg::UploadClicked);
        let id = match effects.as_slice() {
            [Effect::StartUpload { request_id, .. }] => *request_id,
            other => panic!("unexpected effects {other:?}"),
        };
        (state, id)
    };
    assert_ne!(first, second);

    let (state, _) = update(state, Msg::ProgressExpired { request_id: first });
    let progress = state.view().progress.expect("new upload keeps its progress");
    assert_eq!(progress.status, ProgressStatus::Running);
}

#[test]
fn server_side_cancellation_is_informational_and_keeps_previous_report() {
    init_logging();
    let (state, first) = start_upload(AppState::new());
    let (state, _) = update(
        state,
        Msg::UploadFinished {
            request_id: first,
            outcome: UploadOutcome::Success(sample_report()),
        },
    );
    let (state, _) = update(state, Msg::NoticesAcknowledged);
    let (state, effects) = update(state, Msg::UploadClicked);
    let second = match effects.as_slice() {
        [Effect::StartUpload { request_id, .. }] => *request_id,
        other => panic!("unexpected effects {other:?}"),
    };

    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            request_id: second,
            outcome: UploadOutcome::Cancelled,
        },
    );

    assert_eq!(
        effects,
        vec![Effect::ScheduleProgressTeardown { request_id: second }]
    );
    let view = state.view();
    assert_eq!(view.session, SessionState::Cancelled);
    assert_eq!(
        view.progress.map(|p| p.status),
        Some(ProgressStatus::Cancelled)
    );
    assert_eq!(view.notices.len(), 1);
    assert_eq!(view.notices[0].severity, Severity::Info);
    assert_eq!(view.notices[0].kind, None);
    assert!(view.global.is_some());
    assert!(state.report().is_some());
}
