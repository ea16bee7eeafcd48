use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reconcile_core::{FileHandle, UploadRequest};
use reconcile_engine::{
    EngineEvent, FailureKind, ProgressSink, ReqwestUploader, UploadResult, UploadSettings,
    Uploader,
};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn percents(&self) -> Vec<u8> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::UploadProgress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn write_file(dir: &Path, name: &str) -> FileHandle {
    let path = dir.join(name);
    std::fs::write(&path, b"fake spreadsheet bytes").unwrap();
    FileHandle::new(path, 22)
}

fn request(dir: &TempDir) -> UploadRequest {
    UploadRequest {
        crystal_file: write_file(dir.path(), "crystal.xlsx"),
        query_file: write_file(dir.path(), "query.xls"),
    }
}

fn settings(server: &MockServer) -> UploadSettings {
    let mut settings = UploadSettings::new(Url::parse(&server.uri()).unwrap());
    settings.progress_interval = Duration::from_millis(20);
    settings
}

fn success_body() -> serde_json::Value {
    json!({
        "totals": {
            "total_services_crystal": 120,
            "total_services_query": 98,
            "num_professionals": 1,
            "num_users": 1
        },
        "professionals": ["Dr. Ana Ruiz"],
        "users": ["juan.perez"],
        "professional_data": {
            "Dr. Ana Ruiz": {
                "total_servicios": 120,
                "servicios_por_categoria": {"Consulta": 100, "Terapia": 20},
                "download_link": "/download/ana.xlsx",
                "nombre_archivo": "ana.xlsx"
            }
        },
        "user_data": {"juan.perez": {"total_servicios": 98}}
    })
}

#[tokio::test]
async fn upload_posts_both_files_and_parses_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("name=\"file1\"; filename=\"crystal.xlsx\""))
        .and(body_string_contains("name=\"file2\"; filename=\"query.xls\""))
        .and(body_string_contains("name=\"process_id\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = ReqwestUploader::new(settings(&server));
    let sink = TestSink::default();

    let result = uploader
        .upload(1, &request(&dir), "p-1", &sink, CancellationToken::new())
        .await;

    let report = match result {
        UploadResult::Success(report) => report,
        other => panic!("unexpected result {other:?}"),
    };
    assert_eq!(report.totals.total_services_crystal, 120);
    assert_eq!(report.professionals, vec!["Dr. Ana Ruiz".to_string()]);
    let ana = report.professional_data.get("Dr. Ana Ruiz").unwrap();
    assert_eq!(ana.download_link.as_deref(), Some("/download/ana.xlsx"));
}

#[tokio::test]
async fn progress_ticks_are_monotonic_and_stop_after_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(300))
                .set_body_json(success_body()),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = ReqwestUploader::new(settings(&server));
    let sink = TestSink::default();

    let result = uploader
        .upload(4, &request(&dir), "p-4", &sink, CancellationToken::new())
        .await;
    assert!(matches!(result, UploadResult::Success(_)));

    let percents = sink.percents();
    assert!(percents.len() >= 3, "expected several ticks, got {percents:?}");
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert!(percents.iter().all(|p| *p < 100));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.percents().len(), percents.len());
}

#[tokio::test]
async fn payload_error_is_server_reported_even_with_ok_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Column 'Profesional' not found",
            "details": {"crystal_columns": ["Fecha", "Servicio"]}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = ReqwestUploader::new(settings(&server));
    let result = uploader
        .upload(2, &request(&dir), "p-2", &TestSink::default(), CancellationToken::new())
        .await;

    let err = match result {
        UploadResult::Failed(err) => err,
        other => panic!("unexpected result {other:?}"),
    };
    assert_eq!(err.kind, FailureKind::ServerReported { status: 200 });
    assert_eq!(err.message, "Column 'Profesional' not found");
    assert_eq!(err.crystal_columns, vec!["Fecha", "Servicio"]);
    assert!(err.query_columns.is_empty());
}

#[tokio::test]
async fn non_json_body_is_bad_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = ReqwestUploader::new(settings(&server));
    let result = uploader
        .upload(3, &request(&dir), "p-3", &TestSink::default(), CancellationToken::new())
        .await;

    match result {
        UploadResult::Failed(err) => {
            assert_eq!(err.kind, FailureKind::BadResponse);
            assert!(err.message.contains("502"));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(success_body()),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut settings = settings(&server);
    settings.request_timeout = Duration::from_millis(80);
    let uploader = ReqwestUploader::new(settings);
    let result = uploader
        .upload(5, &request(&dir), "p-5", &TestSink::default(), CancellationToken::new())
        .await;

    match result {
        UploadResult::Failed(err) => assert_eq!(err.kind, FailureKind::Timeout),
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_wins_over_a_late_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(400))
                .set_body_json(success_body()),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = ReqwestUploader::new(settings(&server));
    let sink = TestSink::default();
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        trigger.cancel();
    });

    let result = uploader.upload(6, &request(&dir), "p-6", &sink, token).await;
    assert_eq!(result, UploadResult::Cancelled);

    let ticks = sink.percents().len();
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(sink.percents().len(), ticks);
}

#[tokio::test]
async fn already_cancelled_token_never_reports_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = ReqwestUploader::new(settings(&server));
    let token = CancellationToken::new();
    token.cancel();

    let result = uploader
        .upload(7, &request(&dir), "p-7", &TestSink::default(), token)
        .await;
    assert_eq!(result, UploadResult::Cancelled);
}

#[tokio::test]
async fn unreadable_file_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let request = UploadRequest {
        crystal_file: FileHandle::new(dir.path().join("gone.xlsx"), 10),
        query_file: write_file(dir.path(), "query.xlsx"),
    };
    let uploader = ReqwestUploader::new(settings(&server));
    let result = uploader
        .upload(8, &request, "p-8", &TestSink::default(), CancellationToken::new())
        .await;

    match result {
        UploadResult::Failed(err) => {
            assert_eq!(err.kind, FailureKind::FileRead);
            assert!(err.message.contains("gone.xlsx"));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn cancel_notification_posts_process_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cancel-process"))
        .and(body_json(json!({"process_id": "p-9"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cancel-process"))
        .and(body_json(json!({"process_id": "p-unknown"})))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"success": false, "error": "Proceso no encontrado"})),
        )
        .mount(&server)
        .await;

    let uploader = ReqwestUploader::new(settings(&server));
    uploader.notify_cancel("p-9").await.expect("acknowledged");

    let err = uploader.notify_cancel("p-unknown").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::ServerReported { status: 404 });
    assert_eq!(err.message, "Proceso no encontrado");
}
