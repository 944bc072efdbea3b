//! Shared utilities for router-level integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use infracolor::app_state::AppState;
use infracolor::config::AppConfig;
use infracolor::routes;
use infracolor::services::replicate::{
    ImageInput, InferenceClient, Prediction, ProviderError, ProviderState,
};
use infracolor::services::storage::ImageStore;
use infracolor::services::tracker::JobTracker;

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// A 1x1 PNG; enough for magic-byte sniffing and realistic as a payload.
pub fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

/// Scripted stand-in for the Replicate client. Poll responses are served
/// in order; the last one repeats once the script is exhausted.
pub struct ScriptedProvider {
    submit_error: Option<String>,
    polls: Mutex<VecDeque<Prediction>>,
    pub poll_count: AtomicUsize,
    result_bytes: Vec<u8>,
}

impl ScriptedProvider {
    pub fn with_polls(polls: Vec<Prediction>) -> Self {
        Self {
            submit_error: None,
            polls: Mutex::new(polls.into()),
            poll_count: AtomicUsize::new(0),
            result_bytes: b"colorized result bytes".to_vec(),
        }
    }

    pub fn failing_submit(message: &str) -> Self {
        Self {
            submit_error: Some(message.to_string()),
            polls: Mutex::new(VecDeque::new()),
            poll_count: AtomicUsize::new(0),
            result_bytes: Vec::new(),
        }
    }

    pub fn result_bytes(&self) -> Vec<u8> {
        self.result_bytes.clone()
    }
}

pub fn processing() -> Prediction {
    Prediction {
        state: ProviderState::Processing,
        output_url: None,
        error: None,
    }
}

pub fn succeeded() -> Prediction {
    Prediction {
        state: ProviderState::Succeeded,
        output_url: Some("https://replicate.test/out.png".to_string()),
        error: None,
    }
}

pub fn failed(message: &str) -> Prediction {
    Prediction {
        state: ProviderState::Failed,
        output_url: None,
        error: Some(message.to_string()),
    }
}

#[async_trait::async_trait]
impl InferenceClient for ScriptedProvider {
    async fn submit(
        &self,
        _references: &[ImageInput],
        _infrared: &ImageInput,
    ) -> Result<String, ProviderError> {
        match &self.submit_error {
            Some(message) => Err(ProviderError::Submission(message.clone())),
            None => Ok("pred-test".to_string()),
        }
    }

    async fn poll(&self, _prediction_id: &str) -> Result<Prediction, ProviderError> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        let mut polls = self.polls.lock().unwrap();
        if polls.len() > 1 {
            Ok(polls.pop_front().unwrap())
        } else {
            Ok(polls.front().cloned().unwrap_or_else(processing))
        }
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(self.result_bytes.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<ImageStore>,
    _dir: tempfile::TempDir,
}

/// Build a full router over a temporary data directory, with the job
/// tracker polling fast enough for tests.
pub async fn test_app(provider: ScriptedProvider) -> TestApp {
    let dir = tempfile::tempdir().expect("create tempdir");
    let config = AppConfig::for_data_dir(dir.path(), "test-token");
    let store = Arc::new(ImageStore::open(&config).await.expect("open store"));
    let tracker = Arc::new(JobTracker::new(
        Arc::clone(&store),
        Arc::new(provider),
        Duration::from_millis(5),
        Duration::from_secs(5),
    ));
    let state = AppState::new(config, store.clone(), tracker);

    TestApp {
        router: routes::router(state),
        store,
        _dir: dir,
    }
}

fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

fn file_part(name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    part.extend_from_slice(bytes);
    part.extend_from_slice(b"\r\n");
    part
}

fn text_part(name: &str, value: &str) -> Vec<u8> {
    format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
        .into_bytes()
}

fn close_parts(mut body: Vec<u8>) -> Vec<u8> {
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST /api/references with a single file part.
pub fn reference_upload_request(filename: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let body = close_parts(file_part("file", filename, content_type, bytes));
    Request::builder()
        .method("POST")
        .uri("/api/references")
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(body))
        .unwrap()
}

/// POST /api/colorize with an infrared file and a reference_ids field.
pub fn colorize_request(bytes: &[u8], reference_ids: &str) -> Request<Body> {
    let mut body = file_part("file", "infrared.png", "image/png", bytes);
    body.extend_from_slice(&text_part("reference_ids", reference_ids));
    let body = close_parts(body);
    Request::builder()
        .method("POST")
        .uri("/api/colorize")
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(body))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Drive a request through the router, returning status and raw body.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router must produce a response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec();
    (status, bytes)
}

/// Like [`send`], parsing the body as JSON.
pub async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = send(router, request).await;
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response must be JSON")
    };
    (status, json)
}

/// Poll the status endpoint until the job reaches a terminal state,
/// collecting each distinct status seen along the way.
pub async fn poll_until_terminal(
    router: &Router,
    job_id: &str,
) -> (Vec<String>, serde_json::Value) {
    let mut observed: Vec<String> = Vec::new();
    for _ in 0..1000 {
        let (status, body) = send_json(router, get(&format!("/api/colorize/{job_id}"))).await;
        assert_eq!(status, StatusCode::OK, "job must stay queryable: {body}");
        let job_status = body["status"].as_str().expect("status field").to_string();
        if observed.last() != Some(&job_status) {
            observed.push(job_status.clone());
        }
        if job_status == "completed" || job_status == "failed" {
            return (observed, body);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("job never reached a terminal state; observed {observed:?}");
}
