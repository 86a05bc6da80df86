//! Cache keys and URL templates.

use anise_model::Entity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// Deterministic address of one cached resource.
///
/// Entity resources live under `<source>/<type id>/<group>/<key>.<suffix>`;
/// ad-hoc resources under `adhoc/<namespace>/<name>.<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    namespace: String,
    name: String,
    suffix: String,
}

impl ResourceKey {
    pub fn for_entity(entity: &Entity, group: &str, suffix: &str) -> Self {
        Self {
            namespace: format!("{}/{}/{}", entity.source_id, entity.kind().type_id(), group),
            name: file_safe(&entity.extraction_key),
            suffix: suffix.to_string(),
        }
    }

    /// Key for a resource not tied to an entity (tables, calendars, remote
    /// images by URL). Logical keys that are not safe file names are
    /// replaced by their SHA-256 digest.
    pub fn adhoc(namespace: &str, logical_key: &str, suffix: &str) -> Self {
        Self {
            namespace: format!("adhoc/{namespace}"),
            name: file_safe(logical_key),
            suffix: suffix.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Path relative to the cache directory.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.namespace.split('/').filter(|s| !s.is_empty()).collect();
        path.push(format!("{}.{}", self.name, self.suffix));
        path
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.namespace, self.name, self.suffix)
    }
}

fn file_safe(s: &str) -> String {
    let safe = !s.is_empty()
        && s.len() <= 96
        && !s.starts_with('.')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if safe {
        s.to_string()
    } else {
        hex::encode(Sha256::digest(s.as_bytes()))
    }
}

/// URL with `{origin}`, `{key}`, `{id}`, `{kind}` and `{source}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlTemplate(pub String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn expand(&self, origin: &str, entity: &Entity) -> String {
        self.0
            .replace("{origin}", origin.trim_end_matches('/'))
            .replace("{key}", &entity.extraction_key)
            .replace("{id}", entity.id.local())
            .replace("{kind}", entity.kind().file_stem())
            .replace("{source}", &entity.source_id)
    }
}

/// Joins a site-relative path onto `origin`; absolute URLs pass through.
pub fn origin_url(origin: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let origin = origin.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{origin}{path}")
    } else {
        format!("{origin}/{path}")
    }
}
