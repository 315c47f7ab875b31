use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use lib_core::{
    ErrType,
    client::{ArtifactKind, ComparisonService, HttpComparisonClient, UNREACHABLE_MESSAGE},
    config::ServiceConfig,
    media::ImageBlob,
};
use serde_json::json;

#[derive(Debug, Clone)]
struct ReceivedField {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    len: usize,
}

type Received = Arc<Mutex<Vec<ReceivedField>>>;

const DIFF_BYTES: &[u8] = b"\x89PNG fake diff";

async fn compare_ok(State(received): State<Received>, mut multipart: Multipart) -> impl IntoResponse {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        let file_name = field.file_name().map(|s| s.to_owned());
        let content_type = field.content_type().map(|s| s.to_owned());
        let len = field.bytes().await.unwrap().len();
        received.lock().unwrap().push(ReceivedField {
            name,
            file_name,
            content_type,
            len,
        });
    }

    Json(json!({
        "success": true,
        "session_id": "s-1",
        "similarity_percentage": 97.3,
        "total_pixels": 384000,
        "different_pixels": 1200,
        "image_dimensions": "480x800",
        "difference_ratio": 0.312,
        "diff_filename": "d1.png",
        "timestamp": "2025-06-01T08:00:00.000001"
    }))
}

async fn compare_rejected() -> impl IntoResponse {
    Json(json!({ "success": false, "error": "decode failed" }))
}

async fn compare_bad_request() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "No files selected" })))
}

async fn compare_inconsistent() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "similarity_percentage": 50.0,
        "total_pixels": 10,
        "different_pixels": 11,
        "diff_filename": "bad.png"
    }))
}

async fn compare_bad_timestamp() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "similarity_percentage": 97.3,
        "total_pixels": 384000,
        "different_pixels": 1200,
        "diff_filename": "d1.png",
        "timestamp": "not a time"
    }))
}

async fn compare_html() -> impl IntoResponse {
    (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
}

async fn artifact(Path(name): Path<String>) -> axum::response::Response {
    if name == "d1.png" {
        ([("content-type", "image/png")], DIFF_BYTES).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "File not found" }))).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "message": "Image comparison service is running" }))
}

async fn spawn_service(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client_for(compare: axum::routing::MethodRouter<Received>) -> (HttpComparisonClient, Received) {
    let received: Received = Arc::default();
    let router = Router::new()
        .route("/api/compare", compare)
        .route("/api/preview/{name}", get(artifact))
        .route("/api/download/{name}", get(artifact))
        .route("/api/health", get(health))
        .with_state(received.clone());

    let base_url = spawn_service(router).await;
    let client = HttpComparisonClient::new(ServiceConfig::new().with_base_url(base_url)).unwrap();
    (client, received)
}

fn blobs() -> (ImageBlob, ImageBlob) {
    (
        ImageBlob::new("baseline.png", "image/png", vec![1u8; 64]),
        ImageBlob::new("current.jpg", "image/jpeg", vec![2u8; 32]),
    )
}

#[tokio::test]
async fn compare_sends_both_fields_in_one_multipart_request() {
    let (client, received) = client_for(post(compare_ok)).await;
    let (baseline, current) = blobs();

    let result = client.compare(baseline, current).await.unwrap();
    assert_eq!(result.similarity_percentage, 97.3);
    assert_eq!(result.total_pixels, 384000);
    assert_eq!(result.different_pixels, 1200);
    assert_eq!(result.diff_filename, "d1.png");

    let fields = received.lock().unwrap().clone();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "original");
    assert_eq!(fields[0].file_name.as_deref(), Some("baseline.png"));
    assert_eq!(fields[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(fields[0].len, 64);
    assert_eq!(fields[1].name, "current");
    assert_eq!(fields[1].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(fields[1].len, 32);
}

#[tokio::test]
async fn structured_failure_is_service_rejected_with_message() {
    let (client, _) = client_for(post(compare_rejected)).await;
    let (baseline, current) = blobs();

    let err = client.compare(baseline, current).await.unwrap_err();
    assert_eq!(err.err_type(), ErrType::ServiceRejected);
    assert_eq!(err.to_string(), "decode failed");
}

#[tokio::test]
async fn error_status_with_bare_error_body_is_rejected() {
    let (client, _) = client_for(post(compare_bad_request)).await;
    let (baseline, current) = blobs();

    let err = client.compare(baseline, current).await.unwrap_err();
    assert_eq!(err.err_type(), ErrType::ServiceRejected);
    assert_eq!(err.to_string(), "No files selected");
}

#[tokio::test]
async fn inconsistent_counts_are_rejected() {
    let (client, _) = client_for(post(compare_inconsistent)).await;
    let (baseline, current) = blobs();

    let err = client.compare(baseline, current).await.unwrap_err();
    assert_eq!(err.err_type(), ErrType::ServiceRejected);
}

#[tokio::test]
async fn malformed_result_keeps_parse_error() {
    let (client, _) = client_for(post(compare_bad_timestamp)).await;
    let (baseline, current) = blobs();

    let err = client.compare(baseline, current).await.unwrap_err();
    assert_eq!(err.err_type(), ErrType::ServiceRejected);
    assert_eq!(err.to_string(), "Comparison service returned a malformed result");
    assert!(!err.err_message().is_empty());
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let (client, _) = client_for(post(compare_html)).await;
    let (baseline, current) = blobs();

    let err = client.compare(baseline, current).await.unwrap_err();
    assert_eq!(err.err_type(), ErrType::ServiceRejected);
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpComparisonClient::new(ServiceConfig::new().with_base_url(format!("http://{addr}"))).unwrap();
    let (baseline, current) = blobs();

    let err = client.compare(baseline, current).await.unwrap_err();
    assert_eq!(err.err_type(), ErrType::ServiceUnreachable);
    assert_eq!(err.to_string(), UNREACHABLE_MESSAGE);
}

#[tokio::test]
async fn fetches_known_artifact_for_preview_and_download() {
    let (client, _) = client_for(post(compare_ok)).await;

    let preview = client.fetch_artifact("d1.png", ArtifactKind::Preview).await.unwrap();
    assert_eq!(preview, DIFF_BYTES);
    let download = client.fetch_artifact("d1.png", ArtifactKind::Download).await.unwrap();
    assert_eq!(download, DIFF_BYTES);
}

#[tokio::test]
async fn unknown_artifact_is_not_found() {
    let (client, _) = client_for(post(compare_ok)).await;

    let err = client.fetch_artifact("stale.png", ArtifactKind::Download).await.unwrap_err();
    assert_eq!(err.err_type(), ErrType::ArtifactNotFound);

    let err = client.fetch_artifact("", ArtifactKind::Preview).await.unwrap_err();
    assert_eq!(err.err_type(), ErrType::ArtifactNotFound);
}

#[tokio::test]
async fn artifact_fetch_from_closed_port_is_not_found() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpComparisonClient::new(ServiceConfig::new().with_base_url(format!("http://{addr}"))).unwrap();

    for kind in [ArtifactKind::Preview, ArtifactKind::Download] {
        let err = client.fetch_artifact("d1.png", kind).await.unwrap_err();
        assert_eq!(err.err_type(), ErrType::ArtifactNotFound);
    }
}

#[tokio::test]
async fn health_reports_status() {
    let (client, _) = client_for(post(compare_ok)).await;

    let status = client.health().await.unwrap();
    assert_eq!(status.status, "healthy");
}

#[test]
fn invalid_base_url_is_config_error() {
    let err = HttpComparisonClient::new(ServiceConfig::new().with_base_url("not a url")).err().unwrap();
    assert_eq!(err.err_type(), ErrType::ConfigError);
}
