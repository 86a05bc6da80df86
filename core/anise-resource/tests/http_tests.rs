use anise_resource::{
    DataSync, Fetcher, HttpFetcher, HttpRenderer, PageRenderer, RenderRequest, ResourceError, SyncEntry,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── HttpFetcher ──────────────────────────────────────────────────

#[tokio::test]
async fn fetcher_returns_body_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/static/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let response = fetcher
        .get(&format!("{}/static/a.png", server.uri()), Duration::from_secs(5))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.bytes.as_ref(), b"png");
    assert_eq!(response.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn fetcher_reports_status_without_failing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    let response = HttpFetcher::new().unwrap().get(&url, Duration::from_secs(5)).await.unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(
        response.into_bytes(&url).unwrap_err(),
        ResourceError::FetchHttpError { url, status: 404 }
    );
}

#[tokio::test]
async fn fetcher_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let err = HttpFetcher::new()
        .unwrap()
        .get(&format!("{}/slow", server.uri()), Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, ResourceError::FetchTimeout { .. }));
    assert!(err.is_fallthrough());
}

#[tokio::test]
async fn fetcher_posts_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/party/page/"))
        .and(query_param("page_index", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"parties":[1]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/api/v1/party/page/?search_text=fire&page_index=2", server.uri());
    let response = HttpFetcher::new().unwrap().post(&url, Duration::from_secs(5)).await.unwrap();
    assert_eq!(response.bytes.as_ref(), br#"{"parties":[1]}"#);
}

#[tokio::test]
async fn fetcher_maps_unreachable_host_to_network_error() {
    let err = HttpFetcher::new()
        .unwrap()
        .get("http://127.0.0.1:1/unreachable", Duration::from_secs(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Network(_) | ResourceError::FetchTimeout { .. }));
}

// ── HttpRenderer ─────────────────────────────────────────────────

#[tokio::test]
async fn renderer_posts_request_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .and(body_partial_json(serde_json::json!({
            "url": "https://wiki.test/card/table/?table_id=7",
            "selector": ".table",
            "wait_for": "#card-complete",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"shot".to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(format!("{}/render", server.uri())).unwrap();
    let request = RenderRequest::new("https://wiki.test/card/table/?table_id=7", ".table").wait_for("#card-complete");

    assert_eq!(renderer.render(&request).await.unwrap().as_ref(), b"shot");
}

#[tokio::test]
async fn renderer_error_status_is_render_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("selector not found"))
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(server.uri()).unwrap();
    let err = renderer.render(&RenderRequest::new("https://wiki.test/x", "#main-card")).await.unwrap_err();

    match err {
        ResourceError::RenderFailure(message) => assert!(message.contains("selector not found")),
        other => panic!("expected render failure, got {other:?}"),
    }
}

#[tokio::test]
async fn renderer_empty_image_is_render_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(server.uri()).unwrap();
    let err = renderer.render(&RenderRequest::new("https://wiki.test/x", "#main-card")).await.unwrap_err();
    assert!(matches!(err, ResourceError::RenderFailure(_)));
    assert!(!err.is_fallthrough());
}

#[tokio::test]
async fn renderer_timeout_falls_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(server.uri()).unwrap();
    let request = RenderRequest::new("https://wiki.test/x", "#main-card").with_timeout(Duration::from_millis(50));
    assert!(matches!(
        renderer.render(&request).await,
        Err(ResourceError::FetchTimeout { .. })
    ));
}

// ── DataSync ─────────────────────────────────────────────────────

fn entry(url: &str, path: &str) -> SyncEntry {
    SyncEntry {
        url: url.to_string(),
        path: PathBuf::from(path),
        label: path.to_string(),
    }
}

#[tokio::test]
async fn sync_writes_each_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/character.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"101":{}}"#))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sync = DataSync::new(
        Arc::new(HttpFetcher::new().unwrap()),
        dir.path(),
        server.uri(),
        Duration::from_secs(5),
    );
    let report = sync
        .run(&[entry("{origin}/data/character.json", "data/sc/character.json")])
        .await;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("data/sc/character.json")).unwrap(),
        r#"{"101":{}}"#
    );
}

#[tokio::test]
async fn sync_resolves_relative_urls_against_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alias/character.toml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("101 = [\"a\"]\n"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sync = DataSync::new(
        Arc::new(HttpFetcher::new().unwrap()),
        dir.path(),
        server.uri(),
        Duration::from_secs(5),
    );
    let report = sync.run(&[entry("/alias/character.toml", "alias.toml")]).await;
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn failed_sync_keeps_previous_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad.json"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.json"), "old").unwrap();
    let sync = DataSync::new(
        Arc::new(HttpFetcher::new().unwrap()),
        dir.path(),
        server.uri(),
        Duration::from_secs(5),
    );

    let report = sync
        .run(&[entry("/bad.json", "bad.json"), entry("/good.json", "good.json")])
        .await;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(!report.outcomes[0].succeeded());
    assert!(report.outcomes[1].succeeded());
    assert_eq!(std::fs::read_to_string(dir.path().join("bad.json")).unwrap(), "old");
    assert_eq!(std::fs::read_to_string(dir.path().join("good.json")).unwrap(), "new");
}
