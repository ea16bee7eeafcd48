#![allow(dead_code)]

use std::sync::Once;

use reconcile_core::{
    update, AppState, Effect, EntityReport, FileHandle, Msg, ProcessedReport, RequestId, Totals,
    UploadOutcome,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(reconcile_logging::initialize_for_tests);
}

pub fn xlsx(name: &str) -> FileHandle {
    FileHandle::new(format!("/data/{name}"), 2048)
}

/// Chooses both files and presses upload. Returns the assigned request id.
pub fn start_upload(state: AppState) -> (AppState, RequestId) {
    let (state, _) = update(state, Msg::CrystalChosen(Some(xlsx("crystal.xlsx"))));
    let (state, _) = update(state, Msg::QueryChosen(Some(xlsx("query.XLS"))));
    let (state, effects) = update(state, Msg::UploadClicked);
    let request_id = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::StartUpload { request_id, .. } => Some(*request_id),
            _ => None,
        })
        .expect("start upload effect");
    (state, request_id)
}

pub fn sample_report() -> ProcessedReport {
    let mut report = ProcessedReport {
        totals: Totals {
            total_services_crystal: 120,
            total_services_query: 98,
            num_professionals: 2,
            num_users: 1,
            services_by_category: vec![("Consulta".to_string(), 80), ("Terapia".to_string(), 40)],
        },
        professionals: vec![
            "Dr. Ana Ruiz".to_string(),
            "nan".to_string(),
            "carlos diaz".to_string(),
        ],
        users: vec!["juan.perez".to_string(), String::new()],
        ..ProcessedReport::default()
    };
    report.professional_data.insert(
        "Dr. Ana Ruiz".to_string(),
        EntityReport {
            total_services: Some(70),
            total_users: Some(12),
            services_by_category: vec![("Consulta".to_string(), 50), ("Terapia".to_string(), 20)],
            detailed_services: vec![("Consulta general".to_string(), 50)],
            download_link: Some("/download/ana_ruiz.xlsx".to_string()),
            file_name: Some("ana_ruiz.xlsx".to_string()),
        },
    );
    report.professional_data.insert(
        "carlos diaz".to_string(),
        EntityReport {
            total_services: Some(50),
            ..EntityReport::default()
        },
    );
    report.user_data.insert(
        "juan.perez".to_string(),
        EntityReport {
            total_services: Some(98),
            download_link: Some("/download/juan_perez.xlsx".to_string()),
            ..EntityReport::default()
        },
    );
    report
}

/// Runs a full successful upload and returns the settled state.
pub fn loaded_state() -> AppState {
    loaded_with(sample_report())
}

pub fn loaded_with(report: ProcessedReport) -> AppState {
    let (state, request_id) = start_upload(AppState::new());
    let (state, _) = update(
        state,
        Msg::UploadFinished {
            request_id,
            outcome: UploadOutcome::Success(report),
        },
    );
    let (state, _) = update(state, Msg::NoticesAcknowledged);
    state
}
