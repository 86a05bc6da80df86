//! The service context owning every Anise component.

use crate::assemble::{MessageTable, ResponseAssembler};
use crate::config::AniseConfig;
use crate::error::{QueryError, QueryResult};
use crate::handler::QueryContext;
use crate::pipeline::QueryPipeline;
use anise_catalog::{Catalog, CatalogStats};
use anise_model::Card;
use anise_resource::{DataSync, ResourceCache, SyncReport};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of [`Anise::sync_and_reload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    pub sync: SyncReport,
    pub catalog: CatalogStats,
    pub handlers: usize,
}

/// Explicitly constructed services behind the query entry point.
pub struct Anise {
    config: AniseConfig,
    catalog: Arc<Catalog>,
    cache: Arc<ResourceCache>,
    pipeline: QueryPipeline,
    sync: DataSync,
}

impl Anise {
    /// Builds every service from `config` with HTTP collaborators.
    pub async fn open(config: AniseConfig) -> QueryResult<Self> {
        let cache = ResourceCache::from_config(
            &config.root,
            config.cache.clone(),
            config.origin.clone(),
            config.render.clone(),
        )?;
        Self::with_cache(config, Arc::new(cache)).await
    }

    /// Builds the remaining services around an existing cache.
    pub async fn with_cache(config: AniseConfig, cache: Arc<ResourceCache>) -> QueryResult<Self> {
        let root = config.root.clone();
        let sync = DataSync::new(
            cache.fetcher(),
            root.clone(),
            config.origin.base_url.clone(),
            config.origin.timeout(),
        );
        if config.sync.update_on_startup {
            log_sync(&sync.run(&config.sync.entries).await);
        }

        let (catalog, messages) = {
            let root = root.clone();
            let catalog_config = config.catalog.clone();
            let messages_path = root.join(&config.query.messages_path);
            tokio::task::spawn_blocking(move || {
                Catalog::open(root, catalog_config).map(|catalog| (catalog, MessageTable::load(&messages_path)))
            })
            .await
            .map_err(|e| QueryError::Internal(format!("catalog load task failed: {e}")))??
        };
        let catalog = Arc::new(catalog);
        let messages = Arc::new(messages);
        let ctx = QueryContext {
            catalog: Arc::clone(&catalog),
            cache: Arc::clone(&cache),
            assembler: ResponseAssembler::new(messages),
            thresholds: config.query.thresholds,
            party_search_timeout: config.query.party_search_timeout(),
        };
        let pipeline = QueryPipeline::from_file(ctx, root.join(&config.query.handlers_path))?;

        info!(
            root = %root.display(),
            handlers = pipeline.len(),
            entities = catalog.snapshot().store.len(),
            "anise ready"
        );
        Ok(Self {
            config,
            catalog,
            cache,
            pipeline,
            sync,
        })
    }

    pub fn config(&self) -> &AniseConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }

    /// Answers `text`; a query nobody answers yields the failure card.
    pub async fn query(&self, text: &str) -> Card {
        let started = Instant::now();
        let card = self.pipeline.context().assembler.finish(self.pipeline.dispatch(text).await);
        info!(
            query = %text,
            status = ?card.status,
            images = card.images.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query finished"
        );
        card
    }

    /// Reloads entity sources and alias tables.
    pub async fn reload_index(&self) -> QueryResult<CatalogStats> {
        let catalog = Arc::clone(&self.catalog);
        let stats = tokio::task::spawn_blocking(move || catalog.reload())
            .await
            .map_err(|e| QueryError::Internal(format!("index reload task failed: {e}")))??;
        Ok(stats)
    }

    /// Reloads the handler list; returns the new handler count.
    pub fn reload_handlers(&self) -> QueryResult<usize> {
        self.pipeline.reload()
    }

    /// Downloads the configured data files, then reloads index and
    /// handlers.
    pub async fn sync_and_reload(&self) -> QueryResult<ReloadReport> {
        let sync = self.sync.run(&self.config.sync.entries).await;
        log_sync(&sync);
        let catalog = self.reload_index().await?;
        let handlers = self.reload_handlers()?;
        Ok(ReloadReport {
            sync,
            catalog,
            handlers,
        })
    }
}

fn log_sync(report: &SyncReport) {
    if report.failed() > 0 {
        warn!(succeeded = report.succeeded(), failed = report.failed(), "data sync finished with failures");
    } else {
        info!(succeeded = report.succeeded(), "data sync finished");
    }
}
