//! Ordered handler dispatch.
//!
//! Handlers run in registration order and the first non-empty card wins.
//! The handler list is an immutable snapshot behind an atomic pointer: a
//! reload swaps in a complete new list while running dispatches finish on
//! the list they started with.

use crate::error::{QueryError, QueryResult};
use crate::handler::{Handler, QueryContext};
use anise_catalog::normalize_query;
use anise_model::Card;
use arc_swap::ArcSwap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

pub struct QueryPipeline {
    ctx: QueryContext,
    handlers: ArcSwap<Vec<Handler>>,
    /// Handler list file used by [`QueryPipeline::reload`].
    source: Option<PathBuf>,
}

impl QueryPipeline {
    pub fn new(ctx: QueryContext, handlers: Vec<Handler>) -> Self {
        Self {
            ctx,
            handlers: ArcSwap::from_pointee(handlers),
            source: None,
        }
    }

    /// Builds a pipeline from a handler list file.
    pub fn from_file(ctx: QueryContext, path: impl Into<PathBuf>) -> QueryResult<Self> {
        let path = path.into();
        let handlers = load_handlers(&path)?;
        info!(path = %path.display(), handlers = handlers.len(), "query handlers loaded");
        Ok(Self {
            ctx,
            handlers: ArcSwap::from_pointee(handlers),
            source: Some(path),
        })
    }

    pub fn context(&self) -> &QueryContext {
        &self.ctx
    }

    /// Current handler snapshot.
    pub fn handlers(&self) -> Arc<Vec<Handler>> {
        self.handlers.load_full()
    }

    pub fn len(&self) -> usize {
        self.handlers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swaps in a new handler list; returns its length.
    pub fn replace(&self, handlers: Vec<Handler>) -> usize {
        let count = handlers.len();
        self.handlers.store(Arc::new(handlers));
        count
    }

    /// Re-reads the handler file. On error the current list stays active.
    pub fn reload(&self) -> QueryResult<usize> {
        let Some(path) = &self.source else {
            return Ok(self.len());
        };
        let count = self.replace(load_handlers(path)?);
        info!(path = %path.display(), handlers = count, "query handlers reloaded");
        Ok(count)
    }

    /// Dispatches `raw` and converts any error into the generic failure
    /// card. `None` means no handler answered.
    pub async fn dispatch(&self, raw: &str) -> Option<Card> {
        match self.try_dispatch(raw).await {
            Ok(card) => card,
            Err(e) => {
                error!(query = %raw, error = %e, "query dispatch failed");
                Some(self.ctx.assembler.error(&e))
            }
        }
    }

    pub async fn try_dispatch(&self, raw: &str) -> QueryResult<Option<Card>> {
        let started = Instant::now();
        let text = normalize_query(raw);
        let handlers = self.handlers.load_full();

        for (index, handler) in handlers.iter().enumerate() {
            let Some(matched) = handler.check(&text, &self.ctx).await? else {
                continue;
            };
            match handler.produce(matched, &self.ctx).await? {
                Some(card) if !card.is_empty() => {
                    debug!(
                        query = %text,
                        handler = index,
                        kind = handler.kind(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "query answered"
                    );
                    return Ok(Some(card));
                }
                _ => debug!(query = %text, handler = index, kind = handler.kind(), "handler matched without a result"),
            }
        }

        debug!(query = %text, elapsed_ms = started.elapsed().as_millis() as u64, "no handler answered");
        Ok(None)
    }
}

/// Reads a handler list file: `{"query_map": [...]}` or a bare array. A
/// missing file is an empty list.
pub fn load_handlers(path: &Path) -> QueryResult<Vec<Handler>> {
    let config_load = |reason: String| QueryError::ConfigLoad {
        path: path.to_path_buf(),
        reason,
    };
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no handler config, starting with an empty list");
            return Ok(Vec::new());
        }
        Err(e) => return Err(config_load(e.to_string())),
    };
    let value: Value = serde_json::from_str(&text).map_err(|e| config_load(e.to_string()))?;
    parse_handlers(value).map_err(config_load)
}

/// Parses handler descriptors, skipping entries with unknown type tags.
pub fn parse_handlers(value: Value) -> Result<Vec<Handler>, String> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("query_map") {
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err("`query_map` is not a list".to_string()),
            None => Vec::new(),
        },
        _ => return Err("expected an object with `query_map` or a list".to_string()),
    };

    let mut handlers = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match Handler::from_entry(entry) {
            Ok(Some(handler)) => handlers.push(handler),
            Ok(None) => {}
            Err(e) => return Err(format!("handler {index}: {e}")),
        }
    }
    Ok(handlers)
}
