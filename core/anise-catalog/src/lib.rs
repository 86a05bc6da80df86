//! Entity catalog for Anise.
//!
//! Holds every loaded source overlay together with the nickname index used to
//! turn noisy user text into canonical entity ids.
//!
//! # Architecture
//!
//! - [`EntityStore`] keeps one [`SourceOverlay`] per data source, ordered by
//!   registration
//! - [`AliasIndex`] maps normalized aliases to ids through a character trie,
//!   with a Levenshtein-based fuzzy fallback
//! - [`Catalog`] publishes both as one immutable [`Snapshot`] behind an
//!   atomic pointer, so reloads never expose a half-built index

mod alias_index;
mod alias_table;
mod catalog;
mod config;
mod entity_store;
mod error;
mod normalize;

pub use alias_index::{
    AddOutcome, AliasIndex, EXACT_SCORE, FuzzyMatch, GUESS_SCORE, MatchThresholds,
};
pub use alias_table::AliasTable;
pub use catalog::{Catalog, CatalogStats, Snapshot};
pub use config::{AliasTableConfig, CatalogConfig};
pub use entity_store::{EntityStore, SourceOverlay};
pub use error::{CatalogError, CatalogResult};
pub use normalize::{NameNormalizer, normalize_query};
