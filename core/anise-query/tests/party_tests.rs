mod common;

use anise_query::{PartyPage, party_code, split_page};
use anise_resource::ResourceError;
use common::{RouteFetcher, StubRenderer, anise, data_root, write_handlers, ORIGIN};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn page(text: &str, page: u32) -> PartyPage {
    PartyPage {
        text: text.to_string(),
        page,
    }
}

fn parties() -> Vec<u8> {
    json!({"parties": [{"id": "AbC12x"}]}).to_string().into_bytes()
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn trailing_number_is_page() {
    assert_eq!(split_page("knight 3"), page("knight", 3));
    assert_eq!(split_page("knight12"), page("knight", 12));
    assert_eq!(split_page("  knight  "), page("knight", 1));
}

#[test]
fn names_ending_in_06_or_02_keep_first_page() {
    assert_eq!(split_page("boss06"), page("boss06", 1));
    assert_eq!(split_page("event02"), page("event02", 1));
}

#[test]
fn bare_number_leaves_empty_text() {
    assert_eq!(split_page("5"), page("", 5));
}

#[test]
fn oversized_page_number_is_capped() {
    assert_eq!(split_page("knight 99999999999"), page("knight", u32::MAX));
    assert_eq!(split_page("4294967295"), page("", u32::MAX));
}

#[test]
fn party_codes() {
    assert_eq!(party_code("AbC12x"), Some("AbC12x".to_string()));
    assert_eq!(party_code(" abcdef "), Some("abcdef".to_string()));
    assert_eq!(party_code("123456"), None);
    assert_eq!(party_code("abc12"), None);
    assert_eq!(party_code("abc1234"), None);
    assert_eq!(party_code("ab-123"), None);
    assert_eq!(party_code("炎骑士炎骑士"), None);
}

// ── Party search ─────────────────────────────────────────────────

#[tokio::test]
async fn search_probes_then_renders_page() {
    let dir = data_root();
    write_handlers(dir.path(), json!([{"type": "pps"}]));
    let probe = format!("{ORIGIN}/api/v1/party/page/?search_text=knight&page_index=2");
    let fetcher = Arc::new(RouteFetcher::new().route(&probe, 200, parties()));
    let renderer = Arc::new(StubRenderer::ok());
    let anise = anise(dir.path(), fetcher.clone(), renderer.clone()).await;

    let card = anise.pipeline().dispatch("knight 2").await.unwrap();
    assert_eq!(card.images.len(), 1);
    assert_eq!(fetcher.posts.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.requested(), vec![probe]);

    let request = renderer.last();
    assert_eq!(request.url, format!("{ORIGIN}/pure/partySearcher/?q=knight&page=2"));
    assert_eq!(request.selector, "#main-card");
}

#[tokio::test]
async fn search_text_is_url_encoded() {
    let dir = data_root();
    write_handlers(dir.path(), json!([{"type": "PartySearcher"}]));
    let fetcher = Arc::new(RouteFetcher::new().route(
        &format!("{ORIGIN}/api/v1/party/page/?search_text=flame%20knight&page_index=1"),
        200,
        parties(),
    ));
    let renderer = Arc::new(StubRenderer::ok());
    let anise = anise(dir.path(), fetcher, renderer.clone()).await;

    anise.pipeline().dispatch("flame knight").await.unwrap();
    assert_eq!(
        renderer.last().url,
        format!("{ORIGIN}/pure/partySearcher/?q=flame%20knight&page=1")
    );
}

#[tokio::test]
async fn search_without_parties_falls_through() {
    let dir = data_root();
    write_handlers(
        dir.path(),
        json!([{"type": "pps"}, {"type": "text", "content": "fallback"}]),
    );
    let fetcher = Arc::new(RouteFetcher::new().route(
        &format!("{ORIGIN}/api/v1/party/page/"),
        200,
        json!({"parties": []}).to_string().into_bytes(),
    ));
    let renderer = Arc::new(StubRenderer::ok());
    let anise = anise(dir.path(), fetcher, renderer.clone()).await;

    assert_eq!(anise.pipeline().dispatch("nobody").await.unwrap().text, "fallback");
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn search_probe_errors_fall_through() {
    let dir = data_root();
    write_handlers(
        dir.path(),
        json!([{"type": "pps"}, {"type": "text", "content": "fallback"}]),
    );
    // Unrouted probe answers 404; a non-JSON body is rejected too.
    let fetcher = Arc::new(RouteFetcher::new().route(
        &format!("{ORIGIN}/api/v1/party/page/?search_text=garbage"),
        200,
        b"<html>".to_vec(),
    ));
    let anise = anise(dir.path(), fetcher.clone(), Arc::new(StubRenderer::ok())).await;

    assert_eq!(anise.pipeline().dispatch("missing").await.unwrap().text, "fallback");
    assert_eq!(anise.pipeline().dispatch("garbage").await.unwrap().text, "fallback");
    assert_eq!(fetcher.posts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn search_with_empty_text_does_not_probe() {
    let dir = data_root();
    write_handlers(dir.path(), json!([{"type": "pps"}]));
    let fetcher = Arc::new(RouteFetcher::new());
    let anise = anise(dir.path(), fetcher.clone(), Arc::new(StubRenderer::ok())).await;

    assert_eq!(anise.pipeline().dispatch("3").await, None);
    assert_eq!(fetcher.calls(), 0);
}

// ── Party codes ──────────────────────────────────────────────────

#[tokio::test]
async fn party_code_renders_refer_card_once() {
    let dir = data_root();
    write_handlers(dir.path(), json!([{"type": "party_refer"}]));
    let renderer = Arc::new(StubRenderer::ok());
    let anise = anise(dir.path(), Arc::new(RouteFetcher::new()), renderer.clone()).await;

    let first = anise.pipeline().dispatch("AbC12x").await.unwrap();
    let second = anise.pipeline().dispatch("AbC12x").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(renderer.calls(), 1);

    let request = renderer.last();
    assert_eq!(request.url, format!("{ORIGIN}/card/party_refer/?id=AbC12x"));
    assert_eq!(request.wait_for.as_deref(), Some("#card-complete"));
}

#[tokio::test]
async fn failed_refer_render_falls_through() {
    let dir = data_root();
    write_handlers(
        dir.path(),
        json!([{"type": "PartyRefer"}, {"type": "text", "content": "fallback"}]),
    );
    let renderer = Arc::new(StubRenderer::failing(ResourceError::RenderFailure("no card".to_string())));
    let anise = anise(dir.path(), Arc::new(RouteFetcher::new()), renderer).await;

    assert_eq!(anise.pipeline().dispatch("AbC12x").await.unwrap().text, "fallback");
}

#[tokio::test]
async fn non_codes_skip_refer_handler() {
    let dir = data_root();
    write_handlers(dir.path(), json!([{"type": "party_refer"}]));
    let renderer = Arc::new(StubRenderer::ok());
    let anise = anise(dir.path(), Arc::new(RouteFetcher::new()), renderer.clone()).await;

    assert_eq!(anise.pipeline().dispatch("123456").await, None);
    assert_eq!(renderer.calls(), 0);
}
