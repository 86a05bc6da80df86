//! Tiered resource cache for Anise.
//!
//! Resolves `(entity, resource group)` pairs, and ad-hoc keys, to image
//! bytes, preferring fresh files on disk and falling back to the remote
//! origin or the page renderer.
//!
//! # Architecture
//!
//! - [`Fetcher`] and [`PageRenderer`] are the outbound collaborators
//! - [`Resolve`] implementations describe how one resource is acquired;
//!   [`PostProcessed`] decorates any of them
//! - [`DiskStore`] owns cache files, freshness and atomic publishing
//! - [`ResourceCache`] ties groups, keys and collaborators together and
//!   de-duplicates concurrent identical misses
//! - [`DataSync`] refreshes data files from the origin

mod cache;
mod codec;
mod config;
mod error;
mod fetch;
mod key;
mod render;
mod resolver;
mod store;
mod sync;

pub use cache::{Encoding, ResourceCache};
pub use codec::{Background, ResourceFormat, canonicalize, flatten_gif, flatten_still};
pub use config::{
    AcquireConfig, CacheConfig, DEFAULT_TTL_SECS, OriginConfig, PostProcessConfig, RenderConfig,
    ResourceGroupConfig, default_groups,
};
pub use error::{ResourceError, ResourceResult};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};
pub use key::{ResourceKey, UrlTemplate, origin_url};
pub use render::{HttpRenderer, PageRenderer, RenderRequest, UnavailableRenderer, Viewport, WaitUntil};
pub use resolver::{
    Flatten, LocalFile, LocalProbe, PostProcess, PostProcessed, Probe, Remote, Render, Resolve,
};
pub use store::{DiskStore, Ttl, write_atomic};
pub use sync::{DataSync, SyncConfig, SyncEntry, SyncOutcome, SyncReport};
