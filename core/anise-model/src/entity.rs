use crate::ids::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared, read-only handle to an entity owned by a source overlay.
pub type EntityView = Arc<Entity>;

/// Elemental attribute of an entity.
///
/// Overlay files store either the numeric id or the English name; anything
/// unrecognised maps to [`Element::None`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawElement", into = "i64")]
pub enum Element {
    #[default]
    None,
    Fire,
    Water,
    Thunder,
    Wind,
    Light,
    Dark,
}

impl Element {
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Element::None => -1,
            Element::Fire => 0,
            Element::Water => 1,
            Element::Thunder => 2,
            Element::Wind => 3,
            Element::Light => 4,
            Element::Dark => 5,
        }
    }

    #[must_use]
    pub const fn en_name(self) -> &'static str {
        match self {
            Element::None => "none",
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Thunder => "thunder",
            Element::Wind => "wind",
            Element::Light => "light",
            Element::Dark => "dark",
        }
    }

    #[must_use]
    pub fn from_id(id: i64) -> Self {
        match id {
            0 => Element::Fire,
            1 => Element::Water,
            2 => Element::Thunder,
            3 => Element::Wind,
            4 => Element::Light,
            5 => Element::Dark,
            _ => Element::None,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "fire" | "red" => Element::Fire,
            "water" | "blue" => Element::Water,
            "thunder" | "yellow" => Element::Thunder,
            "wind" | "green" => Element::Wind,
            "light" | "white" => Element::Light,
            "dark" | "black" => Element::Dark,
            _ => Element::None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawElement {
    Id(i64),
    Name(String),
}

impl From<RawElement> for Element {
    fn from(raw: RawElement) -> Self {
        match raw {
            RawElement::Id(id) => Element::from_id(id),
            RawElement::Name(name) => Element::from_name(&name),
        }
    }
}

impl From<Element> for i64 {
    fn from(element: Element) -> Self {
        element.id()
    }
}

/// One record as it appears in an overlay data file.
///
/// Only the fields the core relies on are typed; everything else is kept in
/// `attributes` so kind-specific data (skills, stats, cv) survives untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRecord {
    #[serde(alias = "extraction_id", alias = "resource_id")]
    pub extraction_key: String,
    #[serde(alias = "name", default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub rarity: i64,
    #[serde(default)]
    pub element: Element,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// A game object loaded from one source overlay.
///
/// The same logical entity may exist in several overlays under the same id
/// with different attribute values; each copy records the overlay it came
/// from in `source_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub source_id: String,
    /// Key used to address resource files; distinct from `id`.
    pub extraction_key: String,
    /// Display names, first is the default.
    pub names: Vec<String>,
    pub rarity: i64,
    pub element: Element,
    pub attributes: serde_json::Value,
}

impl Entity {
    pub fn from_record(
        kind: EntityKind,
        source_id: impl Into<String>,
        local_id: impl Into<String>,
        record: EntityRecord,
    ) -> Self {
        Self {
            id: EntityId::new(kind, local_id),
            source_id: source_id.into(),
            extraction_key: record.extraction_key,
            names: record.names,
            rarity: record.rarity,
            element: record.element,
            attributes: serde_json::Value::Object(record.attributes),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.id.kind()
    }

    /// First display name, or the canonical id when the record has none.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.names
            .iter()
            .find(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Extract a string attribute using a JSON pointer (e.g., "/cv").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.attributes.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Extract a numeric attribute using a JSON pointer.
    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.attributes.pointer(pointer).and_then(|v| v.as_f64())
    }

    /// Extract a boolean attribute using a JSON pointer.
    pub fn get_bool(&self, pointer: &str) -> Option<bool> {
        self.attributes.pointer(pointer).and_then(|v| v.as_bool())
    }
}
