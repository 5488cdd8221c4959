use super::mocks::MockModel;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use dicom_serve::{
    config::{ArchiveConfig, Config, ModelArgs, ModelConfig, PipelineConfig, ServerConfig},
    ingest::{HttpArchiveFetcher, Pipeline},
    model::{ModelAdapter, ModelRegistry},
    server::{self, ResponseEnvelope, handlers::AppState},
};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

pub const BOUNDARY: &str = "dicom-serve-test-boundary";
pub const MOCK_MODEL: &str = "mock";
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub struct TestApp {
    pub router: Router,
    pub model: Arc<MockModel>,
    pub work_dir: TempDir,
}

/// Create a test configuration bound to the mock model
pub fn create_test_config(work_dir: &Path) -> Config {
    Config {
        server: ServerConfig::default(),
        model: ModelConfig {
            name: MOCK_MODEL.to_string(),
            args: ModelArgs::new(),
            timeout_secs: 30,
        },
        pipeline: PipelineConfig {
            work_dir: Some(work_dir.to_path_buf()),
            memory_diagnostics: true,
        },
        archive: ArchiveConfig::default(),
    }
}

/// Registry holding the built-in models plus the given mock
pub fn registry_with(model: Arc<MockModel>) -> ModelRegistry {
    let mut registry = ModelRegistry::with_builtin_models();
    registry.register(MOCK_MODEL, move |_args| {
        Ok(model.clone() as Arc<dyn ModelAdapter>)
    });
    registry
}

/// Build the app through the same startup path as the binary
pub fn create_test_app(model: MockModel) -> TestApp {
    let work_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let model = Arc::new(model);

    let config = create_test_config(work_dir.path());
    let state = server::build_state(&config, &registry_with(model.clone())).unwrap();

    TestApp {
        router: server::router(state, MAX_UPLOAD_BYTES),
        model,
        work_dir,
    }
}

/// Build the app with a sub-second model timeout and custom upload limit
pub fn create_test_app_with(model: MockModel, timeout: Duration, max_upload_bytes: usize) -> TestApp {
    let work_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let model = Arc::new(model);

    let pipeline = Pipeline::new(
        model.clone(),
        Arc::new(HttpArchiveFetcher::new(&ArchiveConfig::default()).unwrap()),
        work_dir.path().to_path_buf(),
        timeout,
    );
    let state = AppState {
        pipeline,
        model_name: Arc::from(MOCK_MODEL),
        api_version: server::API_VERSION,
    };

    TestApp {
        router: server::router(state, max_upload_bytes),
        model,
        work_dir,
    }
}

/// Build a multipart upload request with an optional `data` part and `dicom` parts
pub fn multipart_request(uri: &str, data: Option<&str>, files: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();

    if let Some(data) = data {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{data}\r\n"
            )
            .as_bytes(),
        );
    }

    for (name, content) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"dicom\"; filename=\"{name}\"\r\nContent-Type: application/dicom\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send a request and decode the response envelope
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, ResponseEnvelope) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let envelope: ResponseEnvelope = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response is not an envelope ({}): {}",
            e,
            String::from_utf8_lossy(&bytes)
        )
    });
    (status, envelope)
}

/// Zip archive with the given entries
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(name.to_string(), zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Assert that no request left anything behind in the work directory
pub fn assert_no_residual_files(work_dir: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(work_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert!(
        leftovers.is_empty(),
        "Expected empty work directory, found: {:?}",
        leftovers
    );
}

/// Sample configuration YAML for testing
pub const SAMPLE_CONFIG_YAML: &str = r#"
server:
  host: "127.0.0.1"
  port: 8080
  max_upload_bytes: 1048576
  logs:
    level: "debug"

model:
  name: "sybil"
  timeout_secs: 120
  args:
    command: "sh"
    args: ["-c", "echo '[0.42]'", "sybil"]
    version: "1.5.0"
    required_fields: ["patientId"]

pipeline:
  memory_diagnostics: true

archive:
  timeout_secs: 10
  max_bytes: 1048576
  max_entries: 100
  max_extracted_bytes: 4194304
"#;
