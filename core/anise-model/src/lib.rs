//! Core catalog model for Anise.
//!
//! Defines the types every other Anise subsystem depends on:
//! - [`Entity`]: one game object loaded from a source overlay
//! - [`EntityId`]: canonical, kind-prefixed identifier (`u101`, `a7`)
//! - [`EntityKind`] / [`Element`]: closed enumerations over the catalog
//! - [`Card`]: the response payload handed to the presentation layer
//!
//! Entities are immutable once loaded; they are shared behind [`EntityView`]
//! so that overlay snapshots can be swapped without copying records.

mod card;
mod entity;
mod ids;

pub use card::{Card, CardImage, CardStatus};
pub use entity::{Element, Entity, EntityRecord, EntityView};
pub use ids::{EntityId, EntityKind, ParseIdError};
