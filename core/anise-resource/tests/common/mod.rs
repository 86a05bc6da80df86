#![allow(dead_code)]

use anise_model::{Entity, EntityKind, EntityRecord};
use anise_resource::{
    CacheConfig, FetchResponse, Fetcher, OriginConfig, PageRenderer, RenderConfig, RenderRequest,
    ResourceCache, ResourceError, ResourceResult,
};
use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::gif::GifEncoder;
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgba, RgbaImage};
use serde_json::json;
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ORIGIN: &str = "https://origin.test";

// ── Image fixtures ───────────────────────────────────────────────

pub fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(pixel));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Animated GIF whose even frames are fully transparent.
pub fn gif_bytes(frames: usize) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        for i in 0..frames {
            let alpha = if i % 2 == 0 { 0 } else { 255 };
            let image = RgbaImage::from_pixel(4, 4, Rgba([255, (i * 40) as u8, 0, alpha]));
            encoder
                .encode_frame(Frame::from_parts(image, 0, 0, Delay::from_numer_denom_ms(100, 1)))
                .unwrap();
        }
    }
    out
}

pub fn character(local_id: &str, key: &str) -> Entity {
    let record: EntityRecord = serde_json::from_value(json!({"extraction_id": key})).unwrap();
    Entity::from_record(EntityKind::Character, "sc", local_id, record)
}

pub fn equipment(local_id: &str, key: &str) -> Entity {
    let record: EntityRecord = serde_json::from_value(json!({"extraction_id": key})).unwrap();
    Entity::from_record(EntityKind::Equipment, "sc", local_id, record)
}

// ── Mock collaborators ───────────────────────────────────────────

/// Fetcher replaying scripted answers; the last one repeats.
pub struct MockFetcher {
    script: Mutex<VecDeque<ResourceResult<FetchResponse>>>,
    last: Mutex<Option<ResourceResult<FetchResponse>>>,
    pub calls: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
    pub delay: Duration,
}

impl MockFetcher {
    pub fn new(script: Vec<ResourceResult<FetchResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn ok(bytes: Vec<u8>) -> Self {
        Self::new(vec![Ok(FetchResponse {
            status: 200,
            bytes: Bytes::from(bytes),
            content_type: None,
        })])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self, url: &str) -> ResourceResult<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(answer) => {
                *self.last.lock().unwrap() = Some(answer.clone());
                answer
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(ResourceError::Network("script exhausted".to_string()))),
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> ResourceResult<FetchResponse> {
        self.next(url).await
    }

    async fn post(&self, url: &str, _timeout: Duration) -> ResourceResult<FetchResponse> {
        self.next(url).await
    }
}

pub struct MockRenderer {
    pub result: ResourceResult<Bytes>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<RenderRequest>>,
}

impl MockRenderer {
    pub fn new(result: ResourceResult<Vec<u8>>) -> Self {
        Self {
            result: result.map(Bytes::from),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render(&self, request: &RenderRequest) -> ResourceResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.result.clone()
    }
}

pub fn origin() -> OriginConfig {
    OriginConfig {
        base_url: ORIGIN.to_string(),
        ..OriginConfig::default()
    }
}

pub fn cache_with(
    root: &Path,
    config: CacheConfig,
    fetcher: Arc<MockFetcher>,
    renderer: Arc<MockRenderer>,
) -> ResourceCache {
    ResourceCache::new(root, config, origin(), RenderConfig::default(), fetcher, renderer)
}
