use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::TimeDelta;
use newsdesk::{
    AppConfig, AppState, InMemoryArticleRepository, create_router,
    auth::{StaticAdmin, TokenService},
    storage::{LocalUploadStore, MockUploadStore, UploadState},
};
use std::{path::Path, sync::Arc};
use tower::util::ServiceExt;

const BOUNDARY: &str = "newsdesk-test-boundary";

fn tokens() -> TokenService {
    TokenService::new(
        Arc::new(StaticAdmin::new("admin", "admin123")),
        b"upload-tests",
        TimeDelta::hours(4),
    )
}

fn app(uploads: UploadState, config: AppConfig) -> Router {
    create_router(AppState {
        articles: Arc::new(InMemoryArticleRepository::new()),
        uploads,
        tokens: Arc::new(tokens()),
        config,
    })
}

fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    let token = tokens().issue("admin").unwrap();
    Request::builder()
        .method(Method::POST)
        .uri("/api/news/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn config_with_dir(dir: &Path) -> AppConfig {
    AppConfig {
        upload_dir: dir.to_path_buf(),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_upload_returns_url_and_file_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_dir(dir.path());
    let store = Arc::new(LocalUploadStore::new(dir.path())) as UploadState;

    let response = app(store.clone(), config.clone())
        .oneshot(upload_request(multipart_body("file", "haber.jpg", b"JPEG")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let url = body_text(response).await;
    assert!(url.starts_with("/uploads/"), "{url}");
    assert!(url.ends_with("_haber.jpg"), "{url}");

    // The returned URL is reachable without a token.
    let served = app(store, config)
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(body_text(served).await, "JPEG");
}

#[tokio::test]
async fn test_upload_without_file_field_is_bad_request() {
    let response = app(Arc::new(MockUploadStore::new()), AppConfig::default())
        .oneshot(upload_request(multipart_body("image", "a.jpg", b"x")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_store_failure_is_bad_request() {
    let response = app(Arc::new(MockUploadStore::new_failing()), AppConfig::default())
        .oneshot(upload_request(multipart_body("file", "a.jpg", b"x")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("image upload failed"));
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let config = AppConfig {
        upload_max_bytes: 1024,
        ..AppConfig::default()
    };

    let response = app(Arc::new(MockUploadStore::new()), config)
        .oneshot(upload_request(multipart_body("file", "big.jpg", &[0u8; 4096])))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_upload_is_not_found() {
    let dir = tempfile::tempdir().unwrap();

    let response = app(Arc::new(MockUploadStore::new()), config_with_dir(dir.path()))
        .oneshot(
            Request::builder()
                .uri("/uploads/missing.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
