use super::*;
use crate::downloader::test_helpers::ScriptedEngine;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;

mod system;

/// Helper to create a test MusicDownloader instance wrapped in Arc
async fn create_test_downloader() -> (
    Arc<MusicDownloader>,
    Arc<ScriptedEngine>,
    tempfile::TempDir,
) {
    let (downloader, engine, temp_dir) =
        crate::downloader::test_helpers::create_test_downloader().await;
    (Arc::new(downloader), engine, temp_dir)
}

/// Read the full response body and parse it as JSON
async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Build a POST request with a JSON body
fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Build a GET request with an empty body
fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_api_server_binds_ephemeral_port() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;

    // Port 0 lets the OS pick, so the bind cannot collide across test runs
    let mut config = (*downloader.config).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let server = tokio::spawn(start_api_server(downloader, Arc::new(config)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!server.is_finished(), "server exited before it was aborted");
    server.abort();
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;

    let handle = downloader.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();
}

#[tokio::test]
async fn test_cors_headers_present_when_enabled() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;

    let mut config = (*downloader.config).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS layer must announce the allowed origin"
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;
    let config = downloader.config.clone();
    let app = create_router(downloader, config);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_api_key_guards_routes() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;

    let mut config = (*downloader.config).clone();
    config.server.api.api_key = Some("test-secret-key".to_string());
    let app = create_router(downloader, Arc::new(config));

    let with_key = |key: Option<&str>| {
        let mut builder = Request::builder().uri("/health");
        if let Some(key) = key {
            builder = builder.header("X-Api-Key", key);
        }
        builder.body(Body::empty()).unwrap()
    };

    let missing = app.clone().oneshot(with_key(None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .clone()
        .oneshot(with_key(Some("wrong-key")))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let valid = app
        .oneshot(with_key(Some("test-secret-key")))
        .await
        .unwrap();
    assert_eq!(valid.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_no_api_key_means_open_access() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;

    let mut config = (*downloader.config).clone();
    config.server.api.api_key = None;
    let app = create_router(downloader, Arc::new(config));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;
    let config = downloader.config.clone();
    let app = create_router(downloader, config);

    let response = app.oneshot(get("/does-not-exist")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_rejects_after_burst() {
    use std::net::SocketAddr;

    let (downloader, _engine, _temp_dir) = create_test_downloader().await;

    // Tight limits so the test doesn't need to spin: burst of 2, 1 req/s
    let mut config = (*downloader.config).clone();
    config.server.api.rate_limit.enabled = true;
    config.server.api.rate_limit.requests_per_second = 1;
    config.server.api.rate_limit.burst_size = 2;
    config.server.api.rate_limit.exempt_paths = vec!["/health".to_string()];
    config.server.api.rate_limit.exempt_ips = vec![];
    let config = Arc::new(config);

    let app = create_router(downloader, config);

    // oneshot() bypasses into_make_service_with_connect_info, so the
    // ConnectInfo extension has to be injected by hand
    let addr: SocketAddr = "10.1.1.1:5555".parse().unwrap();
    let build_request = |uri: &str| {
        Request::builder()
            .uri(uri)
            .extension(axum::extract::ConnectInfo(addr))
            .body(Body::empty())
            .unwrap()
    };

    // The burst passes
    for _ in 0..2 {
        let response = app.clone().oneshot(build_request("/batches")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // The next request is limited
    let response = app.clone().oneshot(build_request("/batches")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "rate_limited");

    // Exempt paths keep working even when the bucket is drained
    let response = app.oneshot(build_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
