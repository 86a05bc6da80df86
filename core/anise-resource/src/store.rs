//! On-disk cache files with mtime-based freshness.

use crate::error::{ResourceError, ResourceResult};
use crate::key::ResourceKey;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Age after which a cached file is refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Never,
    After(Duration),
}

impl Ttl {
    /// Negative seconds mean "never expires"; zero means always stale.
    pub fn from_secs(secs: i64) -> Self {
        match u64::try_from(secs) {
            Ok(secs) => Ttl::After(Duration::from_secs(secs)),
            Err(_) => Ttl::Never,
        }
    }

    pub fn is_fresh(self, age: Duration) -> bool {
        match self {
            Ttl::Never => true,
            Ttl::After(ttl) => age < ttl,
        }
    }
}

/// Cache directory addressed by [`ResourceKey`].
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Cached bytes for `key` if present and younger than `ttl`.
    pub async fn read_fresh(&self, key: &ResourceKey, ttl: Ttl) -> ResourceResult<Option<Bytes>> {
        let path = self.path_for(key);
        if !self.is_fresh_path(&path, ttl).await? {
            return Ok(None);
        }
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn is_fresh(&self, key: &ResourceKey, ttl: Ttl) -> bool {
        self.is_fresh_path(&self.path_for(key), ttl)
            .await
            .unwrap_or(false)
    }

    /// Publishes `bytes` for `key` atomically.
    pub async fn write(&self, key: &ResourceKey, bytes: &[u8]) -> ResourceResult<()> {
        write_atomic(&self.path_for(key), bytes).await
    }

    /// Removes the cached file; returns whether one existed.
    pub async fn remove(&self, key: &ResourceKey) -> ResourceResult<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_fresh_path(&self, path: &Path, ttl: Ttl) -> ResourceResult<bool> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Ok(false);
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .unwrap_or(Duration::ZERO);
        Ok(ttl.is_fresh(age))
    }
}

/// Writes to a uniquely named sibling temp file, then renames it over
/// `path`, so readers never observe a partial file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> ResourceResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ResourceError::CacheWrite(format!("{} has no parent", path.display())))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let result: std::io::Result<()> = async {
        tokio::fs::create_dir_all(parent).await?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(ResourceError::CacheWrite(format!("{}: {e}", path.display())));
    }
    debug!(path = %path.display(), len = bytes.len(), "published file");
    Ok(())
}
