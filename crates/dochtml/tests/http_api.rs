//! HTTP routes exercised through the router without a socket

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

use dochtml::config::AppConfig;
use dochtml::server::state::AppState;
use dochtml::server::DocServer;

const BOUNDARY: &str = "dochtml-test-boundary";

fn app(root: &std::path::Path) -> (Router, AppState) {
    let mut config = AppConfig::default();
    config.storage.upload_root = root.join("uploads");
    config.storage.output_root = root.join("outputs");
    let state = AppState::new(config).unwrap();
    (DocServer::with_state(state.clone()).router(), state)
}

fn multipart_body(files: &[(&str, &[u8])], settings: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(settings) = settings {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"settings\"\r\n\r\n{settings}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn wait_until_done(app: &Router, job_id: &str) -> Value {
    for _ in 0..500 {
        let (status, body) = get_json(app, &format!("/api/status/{}", job_id)).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "completed" || body["status"] == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {} did not finish", job_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upload_convert_download_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = app(dir.path());

    let fixture = dir.path().join("fixture.docx");
    common::write_resume_docx(&fixture);
    let docx = std::fs::read(&fixture).unwrap();

    let body = multipart_body(
        &[("My Resume.docx", &docx), ("virus.exe", b"MZ")],
        Some(r#"{"enable_ocr": false}"#),
    );
    let (status, body) = send(&app, upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    let upload: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(upload["status"], "started");
    assert_eq!(upload["total_files"], 1);
    assert_eq!(upload["total_size"], docx.len() as u64);
    let job_id = upload["job_id"].as_str().unwrap().to_string();

    let snapshot = wait_until_done(&app, &job_id).await;
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["progress"], 100.0);
    assert_eq!(snapshot["results"][0]["original_filename"], "My_Resume.docx");
    assert_eq!(snapshot["results"][0]["status"], "success");

    let (status, html) = get(&app, &format!("/api/download/{}/My_Resume.html", job_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&html).contains("<h1>Experience</h1>"));

    let (status, _) = get(&app, &format!("/api/preview/{}/My_Resume.html", job_id)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, text) = get_json(&app, &format!("/api/extract_text/{}/My_Resume.docx", job_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text["text"].as_str().unwrap().starts_with("Experience"));

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/batch_extract_text/{}", job_id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let batch: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(batch["results"].as_array().unwrap().len(), 1);
    assert_eq!(batch["results"][0]["filename"], "My_Resume.docx");
    assert_eq!(batch["results"][0]["status"], "success");

    let (status, zip) = get(&app, &format!("/api/download-batch/{}", job_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(zip.starts_with(b"PK"));

    let (status, health) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["active_jobs"], 1);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/cleanup/{}", job_id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let cleaned: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(cleaned["status"], "cleaned");

    let (status, _) = get(&app, &format!("/api/status/{}", job_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!state.store().output_dir(job_id.parse().unwrap()).exists());
}

#[tokio::test]
async fn test_upload_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path());

    let (status, _) = send(&app, upload_request(multipart_body(&[], None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, upload_request(multipart_body(&[("a.exe", b"MZ")], None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"]["message"].as_str().unwrap().contains("No valid files"));
}

#[tokio::test]
async fn test_unreadable_settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = app(dir.path());

    let (status, body) = send(
        &app,
        upload_request(multipart_body(&[("a.pdf", b"%PDF")], Some("{not json"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let upload: Value = serde_json::from_slice(&body).unwrap();
    let job_id: uuid::Uuid = upload["job_id"].as_str().unwrap().parse().unwrap();

    let job = state.orchestrator().get_job(job_id).unwrap();
    assert_eq!(job.settings, dochtml::Settings::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_convert_responds_with_results() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path());

    let fixture = dir.path().join("fixture.docx");
    common::write_resume_docx(&fixture);
    let docx = std::fs::read(&fixture).unwrap();

    let mut body = Vec::new();
    for (name, value) in [("extractText", "false"), ("enableOcr", "0")] {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    let files = multipart_body(&[("cv.docx", &docx), ("broken.pdf", b"nope")], None);
    body.extend_from_slice(&files);

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/convert")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let converted: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(converted["success"], 1);
    assert_eq!(converted["failed"], 1);
    let results = converted["results"].as_array().unwrap();
    assert_eq!(results[0]["status"], "success");
    assert!(results[0].get("text_file").is_none());
    assert_eq!(results[1]["status"], "failed");

    let download = results[0]["download_url"].as_str().unwrap();
    let (status, html) = get(&app, download).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&html).contains("<strong>Lead Engineer</strong>"));
}

#[tokio::test]
async fn test_missing_resources_are_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path());
    let unknown = uuid::Uuid::new_v4();

    let (status, body) = get_json(&app, &format!("/api/status/{}", unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");

    let (status, _) = get(&app, &format!("/api/download/{}/cv.html", unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, &format!("/api/preview/{}/..%2F..%2Fetc%2Fpasswd", unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, &format!("/api/download-batch/{}", unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/batch_extract_text/{}", unknown))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path());

    let (status, body) = get_json(&app, "/api/health").await;
    tokio_test::assert_ok!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_jobs"], 0);
}
