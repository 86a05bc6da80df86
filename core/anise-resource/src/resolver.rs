//! Acquisition strategies and the post-processing decorator.
//!
//! A [`Resolve`] produces the bytes of one resource. Strategies compose:
//! the cache wraps an acquisition strategy, and [`PostProcessed`] wraps
//! whatever it is given without touching keys or freshness.

use crate::codec::{self, Background, ResourceFormat};
use crate::error::{ResourceError, ResourceResult};
use crate::fetch::Fetcher;
use crate::render::{PageRenderer, RenderRequest};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self) -> ResourceResult<Bytes>;
}

#[async_trait]
impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    async fn resolve(&self) -> ResourceResult<Bytes> {
        (**self).resolve().await
    }
}

/// Outcome of probing local candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(ResourceFormat, Bytes),
    Missing,
}

/// Local static file tried under an ordered list of extensions.
#[derive(Debug, Clone)]
pub struct LocalProbe {
    /// Path without extension.
    stem: PathBuf,
    formats: Vec<ResourceFormat>,
}

impl LocalProbe {
    pub fn new(stem: impl Into<PathBuf>, formats: Vec<ResourceFormat>) -> Self {
        Self {
            stem: stem.into(),
            formats,
        }
    }

    pub async fn probe(&self) -> ResourceResult<Probe> {
        for format in &self.formats {
            let mut path = self.stem.clone().into_os_string();
            path.push(".");
            path.push(format.extension());
            match tokio::fs::read(&path).await {
                Ok(bytes) => return Ok(Probe::Found(*format, Bytes::from(bytes))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Probe::Missing)
    }
}

#[async_trait]
impl Resolve for LocalProbe {
    async fn resolve(&self) -> ResourceResult<Bytes> {
        match self.probe().await? {
            Probe::Found(_, bytes) => Ok(bytes),
            Probe::Missing => Err(ResourceError::NotFound(self.stem.display().to_string())),
        }
    }
}

/// Exact local file.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Resolve for LocalFile {
    async fn resolve(&self) -> ResourceResult<Bytes> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ResourceError::NotFound(self.path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// HTTP GET against the origin.
#[derive(Clone)]
pub struct Remote {
    fetcher: Arc<dyn Fetcher>,
    url: String,
    timeout: Duration,
}

impl Remote {
    pub fn new(fetcher: Arc<dyn Fetcher>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            fetcher,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Resolve for Remote {
    async fn resolve(&self) -> ResourceResult<Bytes> {
        debug!(url = %self.url, "fetching remote resource");
        let response = self.fetcher.get(&self.url, self.timeout).await?;
        let bytes = response.into_bytes(&self.url)?;
        if bytes.is_empty() {
            return Err(ResourceError::NotFound(self.url.clone()));
        }
        Ok(bytes)
    }
}

/// Page region captured by the render collaborator.
#[derive(Clone)]
pub struct Render {
    renderer: Arc<dyn PageRenderer>,
    request: RenderRequest,
}

impl Render {
    pub fn new(renderer: Arc<dyn PageRenderer>, request: RenderRequest) -> Self {
        Self { renderer, request }
    }

    pub fn request(&self) -> &RenderRequest {
        &self.request
    }
}

#[async_trait]
impl Resolve for Render {
    async fn resolve(&self) -> ResourceResult<Bytes> {
        self.renderer.render(&self.request).await
    }
}

/// Pure transform applied to resolved bytes.
pub trait PostProcess: Send + Sync {
    fn apply(&self, bytes: Bytes) -> ResourceResult<Bytes>;
}

impl<F> PostProcess for F
where
    F: Fn(Bytes) -> ResourceResult<Bytes> + Send + Sync,
{
    fn apply(&self, bytes: Bytes) -> ResourceResult<Bytes> {
        self(bytes)
    }
}

/// Composites a still image over an opaque background.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flatten {
    pub background: Background,
}

impl PostProcess for Flatten {
    fn apply(&self, bytes: Bytes) -> ResourceResult<Bytes> {
        codec::flatten_still(&bytes, self.background)
    }
}

/// Decorator running a [`PostProcess`] over another resolver's output.
pub struct PostProcessed<R> {
    inner: R,
    process: Arc<dyn PostProcess>,
}

impl<R: Resolve> PostProcessed<R> {
    pub fn new(inner: R, process: Arc<dyn PostProcess>) -> Self {
        Self { inner, process }
    }
}

#[async_trait]
impl<R: Resolve> Resolve for PostProcessed<R> {
    async fn resolve(&self) -> ResourceResult<Bytes> {
        let bytes = self.inner.resolve().await?;
        let process = Arc::clone(&self.process);
        tokio::task::spawn_blocking(move || process.apply(bytes))
            .await
            .map_err(|e| ResourceError::Io(format!("post-process task failed: {e}")))?
    }
}
