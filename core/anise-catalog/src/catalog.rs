//! Atomically swappable catalog snapshot.
//!
//! Readers take an `Arc<Snapshot>` and keep using it for as long as they
//! need; writers build a complete replacement off to the side and publish it
//! with a single pointer swap.

use crate::alias_index::{AliasIndex, FuzzyMatch};
use crate::alias_table::AliasTable;
use crate::config::CatalogConfig;
use crate::entity_store::EntityStore;
use crate::error::CatalogResult;
use crate::normalize::NameNormalizer;
use anise_model::{EntityId, EntityView};
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Entity overlays plus the alias index seeded from them.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub store: EntityStore,
    pub aliases: AliasIndex,
}

impl Snapshot {
    /// Seeds a fresh index: alias tables first, then every entity's names in
    /// overlay registration order.
    pub fn build(store: EntityStore, tables: &[AliasTable], normalizer: NameNormalizer) -> Self {
        let mut aliases = AliasIndex::new(normalizer);
        for table in tables {
            for (id, names) in table.entries() {
                for name in names {
                    aliases.add(name, id);
                }
            }
        }
        for overlay in store.overlays() {
            for entity in overlay.iter() {
                for name in &entity.names {
                    aliases.add(name, &entity.id);
                }
            }
        }
        Self { store, aliases }
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            sources: self.store.overlays().len(),
            entities: self.store.len(),
            aliases: self.aliases.len(),
        }
    }
}

/// Counts reported after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub sources: usize,
    pub entities: usize,
    pub aliases: usize,
}

pub struct Catalog {
    root: PathBuf,
    config: CatalogConfig,
    snapshot: ArcSwap<Snapshot>,
    /// Serializes writers so a rebuild never publishes over a newer one.
    write_lock: Mutex<()>,
}

impl Catalog {
    /// A catalog with nothing loaded.
    pub fn empty(root: impl Into<PathBuf>, config: CatalogConfig) -> Self {
        Self {
            root: root.into(),
            config,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// Builds the catalog from every configured source and alias table.
    pub fn open(root: impl Into<PathBuf>, config: CatalogConfig) -> CatalogResult<Self> {
        let catalog = Self::empty(root, config);
        catalog.reload()?;
        Ok(catalog)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn main_source(&self) -> Option<&str> {
        self.config.main_source.as_deref()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Counts for the current snapshot.
    pub fn stats(&self) -> CatalogStats {
        self.snapshot.load().stats()
    }

    /// Reloads all sources and alias tables from disk. On error the current
    /// snapshot stays active.
    pub fn reload(&self) -> CatalogResult<CatalogStats> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut store = EntityStore::new();
        let data_dir = self.root.join(&self.config.data_dir);
        for source_id in &self.config.sources {
            store.load_source(source_id, &data_dir.join(source_id))?;
        }
        let next = Snapshot::build(store, &self.load_tables()?, self.load_normalizer()?);
        Ok(self.publish(next))
    }

    /// Loads (or replaces) one overlay and re-seeds the index around it.
    pub fn load_source(&self, source_id: &str, dir: &Path) -> CatalogResult<CatalogStats> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut store = self.snapshot.load().store.clone();
        store.load_source(source_id, dir)?;
        let next = Snapshot::build(store, &self.load_tables()?, self.load_normalizer()?);
        Ok(self.publish(next))
    }

    /// Re-seeds the alias index from the current overlays and the alias
    /// tables on disk, leaving overlays untouched.
    pub fn rebuild(&self) -> CatalogResult<CatalogStats> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let store = self.snapshot.load().store.clone();
        let next = Snapshot::build(store, &self.load_tables()?, self.load_normalizer()?);
        Ok(self.publish(next))
    }

    /// Looks up an entity, preferring `preferred_source` or else the
    /// configured main source.
    pub fn get(&self, id: &EntityId, preferred_source: Option<&str>) -> Option<EntityView> {
        let source = preferred_source.or(self.main_source());
        self.snapshot.load().store.get(id, source)
    }

    pub fn resolve_exact(&self, text: &str) -> Option<EntityId> {
        self.snapshot.load().aliases.resolve_exact(text)
    }

    pub fn resolve_fuzzy(&self, text: &str) -> Option<FuzzyMatch> {
        self.snapshot.load().aliases.resolve_fuzzy(text)
    }

    fn load_tables(&self) -> CatalogResult<Vec<AliasTable>> {
        self.config
            .alias_tables
            .iter()
            .map(|table| AliasTable::load(&self.root, table))
            .collect()
    }

    fn load_normalizer(&self) -> CatalogResult<NameNormalizer> {
        match &self.config.fold_table {
            Some(path) => NameNormalizer::load_fold_table(&self.root.join(path)),
            None => Ok(NameNormalizer::new()),
        }
    }

    fn publish(&self, next: Snapshot) -> CatalogStats {
        let stats = next.stats();
        self.snapshot.store(Arc::new(next));
        info!(
            sources = stats.sources,
            entities = stats.entities,
            aliases = stats.aliases,
            "catalog snapshot published"
        );
        stats
    }
}
