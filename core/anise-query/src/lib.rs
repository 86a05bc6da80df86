//! Query dispatch for Anise.
//!
//! Turns free-text queries into [`Card`](anise_model::Card)s by running an
//! ordered list of configured handlers against the catalog and the resource
//! cache.
//!
//! # Architecture
//!
//! - [`Handler`] is the closed set of handler kinds, selected by the `type`
//!   tag of each config entry
//! - [`QueryPipeline`] runs handlers in order, first non-empty card wins,
//!   and swaps its handler list atomically on reload
//! - [`ResponseAssembler`] and [`MessageTable`] produce the user-facing
//!   failure, error and guess texts
//! - [`Anise`] owns the catalog, cache, pipeline and data sync

mod assemble;
mod config;
mod context;
mod entity_lookup;
mod error;
mod handler;
mod party;
mod pipeline;

pub use assemble::{MSG_ERROR, MSG_FAILED, MSG_GUESS, MessageTable, ResponseAssembler};
pub use config::{AniseConfig, QueryConfig, load_config};
pub use context::{Anise, ReloadReport};
pub use entity_lookup::{DEFAULT_GROUP, EntityMatch, SUFFIX_MODIFIERS, split_modifier};
pub use error::{ConfigError, QueryError, QueryResult};
pub use handler::{Handler, KNOWN_TAGS, Matched, Pattern, QueryContext};
pub use party::{PartyPage, party_code, split_page};
pub use pipeline::{QueryPipeline, load_handlers, parse_handlers};
