//! External alias tables: id → list of nicknames.

use crate::config::AliasTableConfig;
use crate::error::{CatalogError, CatalogResult};
use anise_model::{EntityId, EntityKind};
use std::path::Path;
use tracing::{debug, warn};

/// Alias table loaded from a JSON or TOML file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<(EntityId, Vec<String>)>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: EntityId, names: Vec<String>) {
        self.entries.push((id, names));
    }

    pub fn entries(&self) -> &[(EntityId, Vec<String>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads a table described by `config`, resolving its path under `root`.
    pub fn load(root: &Path, config: &AliasTableConfig) -> CatalogResult<Self> {
        Self::load_file(&root.join(&config.path), config.kind)
    }

    /// Loads a table file; `.toml` files are parsed as TOML, anything else
    /// as JSON. A missing file is an empty table.
    ///
    /// When `kind` is set, bare numeric keys are read as local ids of that
    /// kind; otherwise keys must be canonical ids (`u101`). Keys that cannot
    /// be resolved are skipped, as are non-string and empty names.
    pub fn load_file(path: &Path, kind: Option<EntityKind>) -> CatalogResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "alias table missing, treating as empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(CatalogError::io(path, e)),
        };

        let raw: serde_json::Map<String, serde_json::Value> =
            if path.extension().is_some_and(|ext| ext == "toml") {
                let table: toml::Table =
                    toml::from_str(&text).map_err(|e| CatalogError::malformed(path, e))?;
                serde_json::to_value(table)
                    .ok()
                    .and_then(|v| v.as_object().cloned())
                    .ok_or_else(|| CatalogError::malformed(path, "top level is not a table"))?
            } else {
                serde_json::from_str(&text).map_err(|e| CatalogError::malformed(path, e))?
            };

        let mut table = Self::new();
        for (key, value) in raw {
            let Some(id) = resolve_key(&key, kind) else {
                warn!(path = %path.display(), key = %key, "skipping alias entry with invalid id");
                continue;
            };
            let names = match value {
                serde_json::Value::Array(items) => items
                    .into_iter()
                    .filter_map(|v| match v {
                        serde_json::Value::String(s) if !s.is_empty() => Some(s),
                        _ => None,
                    })
                    .collect(),
                serde_json::Value::String(s) if !s.is_empty() => vec![s],
                _ => Vec::new(),
            };
            if !names.is_empty() {
                table.push(id, names);
            }
        }
        debug!(path = %path.display(), entries = table.len(), "loaded alias table");
        Ok(table)
    }
}

fn resolve_key(key: &str, kind: Option<EntityKind>) -> Option<EntityId> {
    let numeric = !key.is_empty() && key.chars().all(|c| c.is_ascii_digit());
    match kind {
        Some(kind) if numeric => Some(EntityId::new(kind, key)),
        _ => key.parse().ok(),
    }
}
