//! Identifier types for catalog entities.
//!
//! A canonical id is the entity kind's one-letter prefix followed by the
//! source-scoped numeric id, e.g. `u101` for character 101.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The kinds of game object held by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Equipment,
}

impl EntityKind {
    /// All kinds, in the order overlay files are loaded.
    pub const ALL: [EntityKind; 2] = [EntityKind::Character, EntityKind::Equipment];

    /// One-letter prefix used in canonical ids.
    #[must_use]
    pub const fn id_prefix(self) -> char {
        match self {
            EntityKind::Character => 'u',
            EntityKind::Equipment => 'a',
        }
    }

    /// Three-letter prefix accepted by direct id queries (`uid101`).
    #[must_use]
    pub const fn query_prefix(self) -> &'static str {
        match self {
            EntityKind::Character => "uid",
            EntityKind::Equipment => "aid",
        }
    }

    /// Path segment used for resource files of this kind.
    #[must_use]
    pub const fn type_id(self) -> &'static str {
        match self {
            EntityKind::Character => "worldflipper/character",
            EntityKind::Equipment => "worldflipper/equipment",
        }
    }

    /// File stem of the overlay data file for this kind.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Equipment => "equipment",
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'u' => Some(EntityKind::Character),
            'a' => Some(EntityKind::Equipment),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// Error returned when a canonical id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    #[error("empty entity id")]
    Empty,

    #[error("unknown entity kind prefix '{0}'")]
    UnknownPrefix(char),

    #[error("entity id '{0}' has no local part")]
    MissingLocal(String),
}

/// Canonical identifier of an entity: kind plus source-scoped local id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    kind: EntityKind,
    local: String,
}

impl EntityId {
    #[must_use]
    pub fn new(kind: EntityKind, local: impl Into<String>) -> Self {
        Self {
            kind,
            local: local.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The id as it appears in overlay files (without the kind prefix).
    #[must_use]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Parses the direct-query form `uid101` / `aid7`.
    ///
    /// Only digits are accepted after the prefix and leading zeros are
    /// dropped, so `uid0101` addresses the same entity as `uid101`.
    pub fn parse_query(text: &str) -> Option<Self> {
        EntityKind::ALL.into_iter().find_map(|kind| {
            let digits = text.strip_prefix(kind.query_prefix())?;
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let trimmed = digits.trim_start_matches('0');
            let local = if trimmed.is_empty() { "0" } else { trimmed };
            Some(Self::new(kind, local))
        })
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.id_prefix(), self.local)
    }
}

impl FromStr for EntityId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let prefix = chars.next().ok_or(ParseIdError::Empty)?;
        let kind = EntityKind::from_prefix(prefix).ok_or(ParseIdError::UnknownPrefix(prefix))?;
        let local = chars.as_str();
        if local.is_empty() {
            return Err(ParseIdError::MissingLocal(s.to_string()));
        }
        Ok(Self::new(kind, local))
    }
}

impl TryFrom<String> for EntityId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}
