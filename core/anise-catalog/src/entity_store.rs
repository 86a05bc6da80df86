//! Multi-source entity registry.
//!
//! Each data source contributes one [`SourceOverlay`]. Overlays keep their
//! registration order, which decides precedence when the same id appears in
//! several sources.

use crate::error::{CatalogError, CatalogResult};
use anise_model::{Entity, EntityId, EntityKind, EntityRecord, EntityView};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Entities contributed by one data source.
#[derive(Debug, Clone, Default)]
pub struct SourceOverlay {
    id: String,
    entities: HashMap<EntityId, EntityView>,
    /// Insertion order, so enumeration is deterministic.
    order: Vec<EntityId>,
}

impl SourceOverlay {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Reads `<dir>/character.json` and `<dir>/equipment.json`.
    ///
    /// A missing file contributes nothing. Any malformed file or record
    /// fails the whole overlay.
    pub fn load(id: impl Into<String>, dir: &Path) -> CatalogResult<Self> {
        let id = id.into();
        let mut overlay = Self::new(id.clone());
        for kind in EntityKind::ALL {
            let path = dir.join(format!("{}.json", kind.file_stem()));
            let text = match std::fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(source_id = %id, path = %path.display(), "overlay file missing");
                    continue;
                }
                Err(e) => return Err(CatalogError::io(&path, e)),
            };
            let records: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&text).map_err(|e| CatalogError::malformed(&path, e))?;

            for (local_id, value) in records {
                let record: EntityRecord = serde_json::from_value(value)
                    .map_err(|e| CatalogError::malformed(&path, format!("record {local_id}: {e}")))?;
                overlay.insert(Entity::from_record(kind, id.clone(), local_id, record));
            }
        }
        Ok(overlay)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds an entity; returns false if the id was already present.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity.id) {
            return false;
        }
        self.order.push(entity.id.clone());
        self.entities.insert(entity.id.clone(), Arc::new(entity));
        true
    }

    pub fn get(&self, id: &EntityId) -> Option<&EntityView> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityView> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    overlays: Vec<SourceOverlay>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an overlay. Re-registering a source replaces it in place
    /// and keeps its original precedence.
    pub fn add_overlay(&mut self, overlay: SourceOverlay) {
        match self.overlays.iter_mut().find(|o| o.id == overlay.id) {
            Some(slot) => *slot = overlay,
            None => self.overlays.push(overlay),
        }
    }

    /// Loads `dir` as overlay `source_id`. The store is untouched on error.
    pub fn load_source(&mut self, source_id: &str, dir: &Path) -> CatalogResult<usize> {
        let overlay = SourceOverlay::load(source_id, dir)?;
        let count = overlay.len();
        info!(source_id = %source_id, entities = count, "loaded source overlay");
        self.add_overlay(overlay);
        Ok(count)
    }

    /// Preferred source first if it holds `id`, else the first overlay in
    /// registration order that does.
    pub fn get(&self, id: &EntityId, preferred_source: Option<&str>) -> Option<EntityView> {
        if let Some(found) = preferred_source
            .and_then(|source| self.overlay(source))
            .and_then(|overlay| overlay.get(id))
        {
            return Some(found.clone());
        }
        self.overlays
            .iter()
            .find_map(|overlay| overlay.get(id))
            .cloned()
    }

    /// Every entity of `kind`, deduplicated by id; the first overlay holding
    /// an id supplies its view.
    pub fn enumerate(&self, kind: EntityKind) -> impl Iterator<Item = EntityView> + '_ {
        let mut seen = HashSet::new();
        self.overlays
            .iter()
            .flat_map(|overlay| overlay.iter())
            .filter(move |entity| entity.kind() == kind && seen.insert(entity.id.clone()))
            .cloned()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.overlays.iter().any(|o| o.contains(id))
    }

    /// Sources holding `id`, in registration order.
    pub fn sources_of(&self, id: &EntityId) -> Vec<&str> {
        self.overlays
            .iter()
            .filter(|o| o.contains(id))
            .map(|o| o.id())
            .collect()
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.overlays.iter().map(|o| o.id()).collect()
    }

    pub fn overlay(&self, source_id: &str) -> Option<&SourceOverlay> {
        self.overlays.iter().find(|o| o.id == source_id)
    }

    pub fn overlays(&self) -> &[SourceOverlay] {
        &self.overlays
    }

    /// Total entity count across overlays, duplicates included.
    pub fn len(&self) -> usize {
        self.overlays.iter().map(SourceOverlay::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.iter().all(SourceOverlay::is_empty)
    }
}
