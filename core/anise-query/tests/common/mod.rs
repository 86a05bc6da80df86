#![allow(dead_code)]

use anise_query::{Anise, AniseConfig, QueryResult};
use anise_resource::{
    FetchResponse, Fetcher, OriginConfig, PageRenderer, RenderConfig, RenderRequest, ResourceCache,
    ResourceError, ResourceResult,
};
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::json;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const ORIGIN: &str = "https://wiki.test";
pub const CALENDAR: &str = "https://calendar.test";

pub fn png_bytes(pixel: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(2, 2, Rgba(pixel));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

// ── Mock collaborators ───────────────────────────────────────────

/// Answers by URL prefix; anything else is a 404.
#[derive(Default)]
pub struct RouteFetcher {
    routes: Mutex<Vec<(String, u16, Vec<u8>)>>,
    pub gets: AtomicUsize,
    pub posts: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
}

impl RouteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, prefix: &str, status: u16, body: Vec<u8>) -> Self {
        self.routes.lock().unwrap().push((prefix.to_string(), status, body));
        self
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.posts.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    fn answer(&self, url: &str) -> ResourceResult<FetchResponse> {
        self.urls.lock().unwrap().push(url.to_string());
        let routes = self.routes.lock().unwrap();
        let (status, body) = routes
            .iter()
            .find(|(prefix, _, _)| url.starts_with(prefix.as_str()))
            .map(|(_, status, body)| (*status, body.clone()))
            .unwrap_or((404, Vec::new()));
        Ok(FetchResponse {
            status,
            bytes: Bytes::from(body),
            content_type: None,
        })
    }
}

#[async_trait]
impl Fetcher for RouteFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> ResourceResult<FetchResponse> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.answer(url)
    }

    async fn post(&self, url: &str, _timeout: Duration) -> ResourceResult<FetchResponse> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.answer(url)
    }
}

pub struct StubRenderer {
    result: ResourceResult<Bytes>,
    pub requests: Mutex<Vec<RenderRequest>>,
}

impl StubRenderer {
    pub fn ok() -> Self {
        Self::with(Ok(Bytes::from(png_bytes([10, 20, 30, 255]))))
    }

    pub fn failing(error: ResourceError) -> Self {
        Self::with(Err(error))
    }

    fn with(result: ResourceResult<Bytes>) -> Self {
        Self {
            result,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> RenderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl PageRenderer for StubRenderer {
    async fn render(&self, request: &RenderRequest) -> ResourceResult<Bytes> {
        self.requests.lock().unwrap().push(request.clone());
        self.result.clone()
    }
}

// ── Data root fixture ────────────────────────────────────────────

pub fn write(root: &Path, relative: &str, contents: impl AsRef<[u8]>) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// A data root with one character, one equipment, an alias table and a
/// message table.
pub fn data_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "data/sc/character.json",
        json!({
            "101": {
                "extraction_id": "flame_knight",
                "names": ["Flame Knight", "炎骑士"],
                "rarity": 5,
                "element": 0
            }
        })
        .to_string(),
    );
    write(
        root,
        "data/sc/equipment.json",
        json!({"7": {"extraction_id": "sword7", "names": ["Sword of Dawn"]}}).to_string(),
    );
    write(root, "resources/alias/character.toml", "101 = [\"炎骑\"]\n");
    write(
        root,
        "config/message_contents.json",
        json!({
            "query.failed": ["没有找到", "unused"],
            "query.error": "发生了错误",
            "query.guess": "你要找的是不是{guess_content}"
        })
        .to_string(),
    );
    dir
}

pub fn write_handlers(root: &Path, handlers: serde_json::Value) {
    write(
        root,
        "resources/query/config.json",
        json!({ "query_map": handlers }).to_string(),
    );
}

pub fn config(root: &Path) -> AniseConfig {
    let mut config = AniseConfig::rooted(root);
    config.origin = OriginConfig {
        base_url: ORIGIN.to_string(),
        calendar_url: CALENDAR.to_string(),
        ..OriginConfig::default()
    };
    config
}

pub async fn anise(root: &Path, fetcher: Arc<RouteFetcher>, renderer: Arc<StubRenderer>) -> Anise {
    anise_with(config(root), fetcher, renderer).await
}

pub async fn anise_with(config: AniseConfig, fetcher: Arc<RouteFetcher>, renderer: Arc<StubRenderer>) -> Anise {
    try_anise(config, fetcher, renderer).await.unwrap()
}

pub async fn try_anise(
    config: AniseConfig,
    fetcher: Arc<RouteFetcher>,
    renderer: Arc<StubRenderer>,
) -> QueryResult<Anise> {
    let cache = ResourceCache::new(
        &config.root,
        config.cache.clone(),
        config.origin.clone(),
        RenderConfig::default(),
        fetcher,
        renderer,
    );
    Anise::with_cache(config, Arc::new(cache)).await
}
