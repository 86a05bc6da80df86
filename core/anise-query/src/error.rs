//! Error types for the query layer.

use anise_catalog::CatalogError;
use anise_resource::ResourceError;
use std::path::PathBuf;
use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    /// A handler list could not be loaded; the previous list stays active.
    #[error("failed to load handlers from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
