//! Tiered resource cache.
//!
//! A lookup first serves a fresh cache file. On a miss the configured
//! acquisition runs (remote fetch or page render), the result is
//! re-encoded and published atomically, and the fresh bytes are returned
//! even if publishing fails. Failed acquisitions never write a file, so the
//! next call retries.

use crate::codec::{self, Background};
use crate::config::{AcquireConfig, CacheConfig, OriginConfig, PostProcessConfig, RenderConfig, ResourceGroupConfig};
use crate::error::{ResourceError, ResourceResult};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::key::{ResourceKey, origin_url};
use crate::render::{HttpRenderer, PageRenderer, RenderRequest, UnavailableRenderer};
use crate::resolver::{Flatten, LocalFile, LocalProbe, PostProcess, PostProcessed, Remote, Render, Resolve};
use crate::store::{DiskStore, Ttl};
use anise_model::Entity;
use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, warn};

type SharedAcquire = Shared<BoxFuture<'static, ResourceResult<Bytes>>>;
type FlightMap = Arc<Mutex<HashMap<ResourceKey, Flight>>>;

struct Flight {
    id: u64,
    shared: SharedAcquire,
    waiters: usize,
}

/// Held by each caller awaiting a flight. The last one to leave drops the
/// map entry, so an abandoned flight is never joined by later callers.
struct Waiter {
    in_flight: FlightMap,
    key: ResourceKey,
    id: u64,
}

impl Drop for Waiter {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.in_flight);
        let last = match in_flight.get_mut(&self.key) {
            Some(flight) if flight.id == self.id => {
                flight.waiters = flight.waiters.saturating_sub(1);
                flight.waiters == 0
            }
            _ => false,
        };
        if last {
            in_flight.remove(&self.key);
        }
    }
}

fn end_flight(in_flight: &FlightMap, key: &ResourceKey, id: u64) {
    let mut in_flight = lock(in_flight);
    if in_flight.get(key).is_some_and(|flight| flight.id == id) {
        in_flight.remove(key);
    }
}

fn lock(in_flight: &FlightMap) -> MutexGuard<'_, HashMap<ResourceKey, Flight>> {
    in_flight.lock().unwrap_or_else(|e| e.into_inner())
}

/// How fetched bytes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Store exactly what was fetched.
    Raw,
    /// Re-encode images (flattened GIF frames, PNG for stills).
    Canonical,
}

pub struct ResourceCache {
    config: CacheConfig,
    origin: OriginConfig,
    render: RenderConfig,
    local_root: PathBuf,
    store: DiskStore,
    fetcher: Arc<dyn Fetcher>,
    renderer: Arc<dyn PageRenderer>,
    in_flight: FlightMap,
    next_flight: AtomicU64,
}

impl ResourceCache {
    /// Paths in `config` are resolved under `root`.
    pub fn new(
        root: &Path,
        config: CacheConfig,
        origin: OriginConfig,
        render: RenderConfig,
        fetcher: Arc<dyn Fetcher>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Self {
        Self {
            local_root: root.join(&config.local_dir),
            store: DiskStore::new(root.join(&config.cache_dir)),
            config,
            origin,
            render,
            fetcher,
            renderer,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_flight: AtomicU64::new(0),
        }
    }

    /// Builds the cache with HTTP collaborators from configuration.
    pub fn from_config(
        root: &Path,
        config: CacheConfig,
        origin: OriginConfig,
        render: RenderConfig,
    ) -> ResourceResult<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);
        let renderer: Arc<dyn PageRenderer> = match &render.endpoint {
            Some(endpoint) => Arc::new(HttpRenderer::new(endpoint.clone())?),
            None => Arc::new(UnavailableRenderer),
        };
        Ok(Self::new(root, config, origin, render, fetcher, renderer))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn origin(&self) -> &OriginConfig {
        &self.origin
    }

    pub fn store(&self) -> &DiskStore {
        &self.store
    }

    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        Arc::clone(&self.fetcher)
    }

    pub fn group(&self, name: &str) -> Option<&ResourceGroupConfig> {
        self.config.groups.get(name)
    }

    pub fn background(&self) -> Background {
        self.config.background
    }

    /// TTL for resources that do not belong to a group.
    pub fn default_ttl(&self) -> Ttl {
        Ttl::from_secs(self.config.default_ttl_secs)
    }

    /// `path` joined onto the origin.
    pub fn origin_url(&self, path: &str) -> String {
        origin_url(&self.origin.base_url, path)
    }

    /// Resolver for a remote URL with the origin timeout.
    pub fn remote(&self, url: impl Into<String>) -> Remote {
        Remote::new(self.fetcher(), url, self.origin.timeout())
    }

    /// Render request with the configured viewport and timeout.
    pub fn render_request(&self, url: impl Into<String>, selector: impl Into<String>) -> RenderRequest {
        RenderRequest::new(url, selector)
            .with_viewport(self.render.viewport)
            .with_timeout(self.render.timeout())
    }

    pub fn renderer(&self, request: RenderRequest) -> Render {
        Render::new(Arc::clone(&self.renderer), request)
    }

    /// A static file under the local resource root.
    pub async fn local_file(&self, relative: &Path) -> ResourceResult<Bytes> {
        if relative.is_absolute() || relative.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(ResourceError::NotFound(relative.display().to_string()));
        }
        LocalFile::new(self.local_root.join(relative)).resolve().await
    }

    /// Resolves `group` for `entity`, using the group's suffix unless
    /// `suffix` overrides it.
    pub async fn get(&self, entity: &Entity, group: &str, suffix: Option<&str>) -> ResourceResult<Bytes> {
        let config = self
            .group(group)
            .ok_or_else(|| ResourceError::UnknownGroup(group.to_string()))?;
        if !config.kinds.contains(&entity.kind()) {
            return Err(ResourceError::NotFound(format!("{group} has no {} resources", entity.kind())));
        }
        let suffix = suffix.unwrap_or(&config.suffix);
        let key = ResourceKey::for_entity(entity, group, suffix);

        let acquire: Arc<dyn Resolve> = match &config.acquire {
            AcquireConfig::Local { formats } => {
                // Local resources are already on disk; there is nothing to cache.
                let stem = self
                    .local_root
                    .join(entity.kind().type_id())
                    .join(group)
                    .join(key.name());
                let probe = LocalProbe::new(stem, formats.clone());
                return self.post_process(config, probe).await;
            }
            AcquireConfig::Remote { url } => Arc::new(self.remote(url.expand(&self.origin.base_url, entity))),
            AcquireConfig::Render { url, selector } => {
                let request = self.render_request(url.expand(&self.origin.base_url, entity), selector.clone());
                Arc::new(self.renderer(request))
            }
        };

        let encoding = if config.reencode { Encoding::Canonical } else { Encoding::Raw };
        let cached = Cached {
            cache: self,
            key,
            ttl: config.ttl(self.config.default_ttl_secs),
            acquire,
            encoding,
        };
        self.post_process(config, cached).await
    }

    async fn post_process<R: Resolve>(&self, config: &ResourceGroupConfig, resolver: R) -> ResourceResult<Bytes> {
        match config.post_process {
            Some(PostProcessConfig::Flatten) => {
                let flatten: Arc<dyn PostProcess> = Arc::new(Flatten {
                    background: self.config.background,
                });
                PostProcessed::new(resolver, flatten).resolve().await
            }
            None => resolver.resolve().await,
        }
    }

    /// Cached lookup of an arbitrary resource.
    pub async fn get_with(
        &self,
        key: &ResourceKey,
        ttl: Ttl,
        acquire: Arc<dyn Resolve>,
        encoding: Encoding,
    ) -> ResourceResult<Bytes> {
        if let Some(bytes) = self.read_cached(key, ttl).await {
            debug!(key = %key, "cache hit");
            return Ok(bytes);
        }

        if !self.config.dedupe_in_flight {
            return acquire_and_publish(self.store.clone(), key.clone(), acquire, encoding, self.config.background)
                .await;
        }

        let (shared, _waiter) = {
            let mut in_flight = lock(&self.in_flight);
            let (id, shared) = match in_flight.get_mut(key) {
                Some(flight) => {
                    debug!(key = %key, "joining in-flight acquisition");
                    flight.waiters += 1;
                    (flight.id, flight.shared.clone())
                }
                None => {
                    let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                    let shared = self.spawn_flight(key, id, acquire, encoding);
                    in_flight.insert(
                        key.clone(),
                        Flight {
                            id,
                            shared: shared.clone(),
                            waiters: 1,
                        },
                    );
                    (id, shared)
                }
            };
            let waiter = Waiter {
                in_flight: Arc::clone(&self.in_flight),
                key: key.clone(),
                id,
            };
            (shared, waiter)
        };

        shared.await
    }

    /// Starts an acquisition on its own task. It runs to completion, and
    /// publishes its result, even when every waiter has gone away.
    fn spawn_flight(&self, key: &ResourceKey, id: u64, acquire: Arc<dyn Resolve>, encoding: Encoding) -> SharedAcquire {
        let in_flight = Arc::clone(&self.in_flight);
        let store = self.store.clone();
        let background = self.config.background;
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let result = acquire_and_publish(store, task_key.clone(), acquire, encoding, background).await;
            end_flight(&in_flight, &task_key, id);
            result
        });
        task.map(|joined| {
            joined.unwrap_or_else(|e| Err(ResourceError::Io(format!("acquisition task failed: {e}"))))
        })
        .boxed()
        .shared()
    }

    /// Number of acquisitions currently shared between callers.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Drops the cached file for `key`; returns whether one existed.
    pub async fn invalidate(&self, key: &ResourceKey) -> ResourceResult<bool> {
        self.store.remove(key).await
    }

    pub async fn is_fresh(&self, key: &ResourceKey, ttl: Ttl) -> bool {
        self.store.is_fresh(key, ttl).await
    }

    async fn read_cached(&self, key: &ResourceKey, ttl: Ttl) -> Option<Bytes> {
        match self.store.read_fresh(key, ttl).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, refetching");
                None
            }
        }
    }
}

/// Cache layer as a resolver, so decorators can wrap it.
struct Cached<'a> {
    cache: &'a ResourceCache,
    key: ResourceKey,
    ttl: Ttl,
    acquire: Arc<dyn Resolve>,
    encoding: Encoding,
}

#[async_trait]
impl<'a> Resolve for Cached<'a> {
    async fn resolve(&self) -> ResourceResult<Bytes> {
        self.cache
            .get_with(&self.key, self.ttl, Arc::clone(&self.acquire), self.encoding)
            .await
    }
}

async fn acquire_and_publish(
    store: DiskStore,
    key: ResourceKey,
    acquire: Arc<dyn Resolve>,
    encoding: Encoding,
    background: Background,
) -> ResourceResult<Bytes> {
    let started = Instant::now();
    let fetched = acquire.resolve().await?;

    let bytes = match encoding {
        Encoding::Raw => fetched,
        Encoding::Canonical => tokio::task::spawn_blocking(move || codec::canonicalize(&fetched, background))
            .await
            .map_err(|e| ResourceError::Io(format!("encode task failed: {e}")))??
            .1,
    };

    // The write runs detached so that a cancelled caller cannot leave a
    // partial file behind.
    let write = {
        let store = store.clone();
        let key = key.clone();
        let bytes = bytes.clone();
        tokio::spawn(async move { store.write(&key, &bytes).await })
    };
    match write.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(key = %key, error = %e, "failed to persist resource, serving fetched bytes"),
        Err(e) => warn!(key = %key, error = %e, "cache write task failed"),
    }

    debug!(key = %key, len = bytes.len(), elapsed_ms = started.elapsed().as_millis() as u64, "acquired resource");
    Ok(bytes)
}
