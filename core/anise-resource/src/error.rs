//! Error types for resource acquisition.

use thiserror::Error;

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors that can occur while resolving a resource.
///
/// Cloneable so that every waiter on a shared in-flight fetch receives the
/// same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Nothing exists for the requested key.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The origin did not answer in time.
    #[error("fetch timed out: {url}")]
    FetchTimeout { url: String },

    /// The origin answered with a non-success status.
    #[error("fetch of {url} failed with HTTP {status}")]
    FetchHttpError { url: String, status: u16 },

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The page renderer failed (load error, selector missing, service down).
    #[error("render failed: {0}")]
    RenderFailure(String),

    /// Bytes could not be decoded or re-encoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Publishing a cache file failed.
    #[error("cache write failed: {0}")]
    CacheWrite(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(String),

    /// No resource group with this name is configured.
    #[error("unknown resource group: {0}")]
    UnknownGroup(String),
}

impl ResourceError {
    /// Whether a handler should treat this as "no content" and let dispatch
    /// continue, rather than surfacing a failure.
    pub fn is_fallthrough(&self) -> bool {
        matches!(
            self,
            ResourceError::NotFound(_)
                | ResourceError::FetchTimeout { .. }
                | ResourceError::FetchHttpError { .. }
                | ResourceError::Network(_)
                | ResourceError::Decode(_)
        )
    }
}

impl From<std::io::Error> for ResourceError {
    fn from(e: std::io::Error) -> Self {
        ResourceError::Io(e.to_string())
    }
}

impl From<image::ImageError> for ResourceError {
    fn from(e: image::ImageError) -> Self {
        ResourceError::Decode(e.to_string())
    }
}
