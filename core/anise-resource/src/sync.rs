//! Data file updates from the origin.

use crate::error::ResourceResult;
use crate::fetch::Fetcher;
use crate::key::origin_url;
use crate::store::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One file kept in sync with the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    /// Absolute URL or origin-relative path; `{origin}` is expanded.
    pub url: String,
    /// Destination relative to the data root.
    pub path: PathBuf,
    /// Name used in logs and reports.
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Run the sync before the first catalog load.
    pub update_on_startup: bool,
    pub entries: Vec<SyncEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub label: String,
    pub path: PathBuf,
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-entry result of a sync run, in entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Downloads configured data files and publishes each one atomically. A
/// failed entry leaves the previous file in place.
pub struct DataSync {
    fetcher: Arc<dyn Fetcher>,
    root: PathBuf,
    origin: String,
    timeout: Duration,
}

impl DataSync {
    pub fn new(fetcher: Arc<dyn Fetcher>, root: impl Into<PathBuf>, origin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            fetcher,
            root: root.into(),
            origin: origin.into(),
            timeout,
        }
    }

    pub async fn run(&self, entries: &[SyncEntry]) -> SyncReport {
        let mut report = SyncReport::default();
        for entry in entries {
            let url = origin_url(&self.origin, &entry.url.replace("{origin}", self.origin.trim_end_matches('/')));
            info!(label = %entry.label, url = %url, "updating data file");

            let error = match self.update_one(&url, &self.root.join(&entry.path)).await {
                Ok(()) => {
                    info!(label = %entry.label, "data file updated");
                    None
                }
                Err(e) => {
                    warn!(label = %entry.label, error = %e, "data file update failed");
                    Some(e.to_string())
                }
            };
            report.outcomes.push(SyncOutcome {
                label: entry.label.clone(),
                path: entry.path.clone(),
                error,
            });
        }
        report
    }

    async fn update_one(&self, url: &str, path: &Path) -> ResourceResult<()> {
        let bytes = self.fetcher.get(url, self.timeout).await?.into_bytes(url)?;
        write_atomic(path, &bytes).await
    }
}
