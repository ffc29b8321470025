use super::*;
use crate::downloader::test_helpers::wait_for_batch;
use crate::types::Event;
use futures::StreamExt;

#[tokio::test]
async fn capabilities_report_startup_probe() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;
    let app = create_router(downloader.clone(), downloader.config.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/capabilities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["media_engine"]["name"], "scripted");
    assert_eq!(body["media_engine"]["available"], true);
    assert_eq!(body["media_engine"]["version"], "scripted 1.0");
    assert_eq!(body["streaming_engine"]["available"], false);
    assert_eq!(body["encoder_present"], true);
}

#[tokio::test]
async fn logs_return_buffered_lines() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;

    let session = downloader
        .submit_batch("one", Default::default())
        .await
        .unwrap();
    wait_for_batch(&downloader, session.id).await;

    let app = create_router(downloader.clone(), downloader.config.clone());
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/logs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let lines = body["lines"].as_array().unwrap();
    assert!(!lines.is_empty(), "a finished batch leaves log lines behind");
    assert_eq!(body["count"], lines.len());
    assert!(
        lines
            .iter()
            .any(|l| l.as_str().unwrap().contains("[START]")),
        "batch start milestone should be in the log"
    );

    // limit returns only the most recent lines
    let response = app
        .oneshot(
            Request::builder()
                .uri("/logs?limit=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn openapi_json_is_served() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;
    let app = create_router(downloader.clone(), downloader.config.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert!(body["paths"]["/api/v1/batches"].is_object());
}

#[tokio::test]
async fn swagger_ui_follows_config_flag() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;

    // Enabled (default): the UI answers under /swagger-ui
    let app = create_router(downloader.clone(), downloader.config.clone());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/swagger-ui")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(
        response.status().is_success() || response.status().is_redirection(),
        "swagger-ui should be mounted when enabled, got {}",
        response.status()
    );

    // Disabled: the path falls through to 404
    let mut config = (*downloader.config).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(downloader.clone(), Arc::new(config));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/swagger-ui")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sse_stream_delivers_emitted_events() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;
    let app = create_router(downloader.clone(), downloader.config.clone());

    let request = Request::builder()
        .uri("/events")
        .header("Accept", "text/event-stream")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(
        content_type.contains("text/event-stream"),
        "Content-Type should be text/event-stream, got: {}",
        content_type
    );

    // The handler subscribed when it ran, so an event emitted now reaches
    // this response's stream
    downloader.emit_event(Event::ArchiveCleared { entries_removed: 3 });

    let mut frames = response.into_body().into_data_stream();
    let frame = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .expect("timed out waiting for an SSE frame")
        .expect("SSE stream ended unexpectedly")
        .expect("SSE body error");

    let text = String::from_utf8(frame.to_vec()).unwrap();
    assert!(
        text.contains("event: archive_cleared"),
        "frame should be named after the event variant: {text}"
    );
    assert!(
        text.contains("entries_removed"),
        "frame should carry the JSON payload: {text}"
    );
}

#[tokio::test]
async fn sse_event_names_cover_batch_lifecycle() {
    let (downloader, _engine, _temp_dir) = create_test_downloader().await;
    let app = create_router(downloader.clone(), downloader.config.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Run a real batch while the SSE response is live and collect frames
    // until the completion event arrives
    let session = downloader
        .submit_batch("one", Default::default())
        .await
        .unwrap();
    wait_for_batch(&downloader, session.id).await;

    let mut frames = response.into_body().into_data_stream();
    let mut seen = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !seen.contains("event: batch_completed") {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let frame = tokio::time::timeout(remaining, frames.next())
            .await
            .expect("timed out waiting for batch_completed")
            .expect("SSE stream ended unexpectedly")
            .expect("SSE body error");
        seen.push_str(&String::from_utf8(frame.to_vec()).unwrap());
    }

    assert!(seen.contains("event: batch_started"));
    assert!(seen.contains("event: item_dispatched"));
    assert!(seen.contains("event: item_completed"));
    assert!(seen.contains("event: batch_completed"));
}
