//! Configured query handlers.
//!
//! A handler is a predicate plus a producer. The set of handler kinds is
//! closed; the `type` tag of each config entry (including the legacy
//! spellings listed in [`KNOWN_TAGS`]) selects the variant.

use crate::assemble::ResponseAssembler;
use crate::entity_lookup::{self, EntityMatch};
use crate::error::QueryResult;
use crate::party::{self, PartyPage};
use anise_catalog::{Catalog, MatchThresholds};
use anise_model::Card;
use anise_resource::{Encoding, RenderRequest, ResourceCache, ResourceKey, ResourceResult, Ttl, WaitUntil};
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use regex_lite::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Every `type` tag accepted in handler configuration.
pub const KNOWN_TAGS: &[&str] = &[
    "text",
    "Text",
    "image",
    "Image",
    "local_image",
    "LocalImage",
    "image_local",
    "ImageLocal",
    "server_image",
    "ServerImage",
    "image_server",
    "ImageServer",
    "remote_image",
    "remote_render",
    "server_table",
    "ServerTable",
    "schedule",
    "Schedule",
    "wfo",
    "WorldflipperObject",
    "worldflipper_object",
    "entity_lookup",
    "party_refer",
    "PartyRefer",
    "pps",
    "party_search",
    "PurePartySearcher",
    "pure_party_searcher",
    "PartySearcher",
    "party_searcher",
    "composite",
    "set",
];

const MAIN_CARD: &str = "#main-card";

/// Services a handler may consult while producing a card.
#[derive(Clone)]
pub struct QueryContext {
    pub catalog: Arc<Catalog>,
    pub cache: Arc<ResourceCache>,
    pub assembler: ResponseAssembler,
    pub thresholds: MatchThresholds,
    pub party_search_timeout: Duration,
}

/// Regex predicate with search semantics. An empty pattern matches any
/// text.
#[derive(Clone, Default)]
pub struct Pattern(Option<Regex>);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex_lite::Error> {
        if source.is_empty() {
            return Ok(Self(None));
        }
        Regex::new(source).map(|re| Self(Some(re)))
    }

    pub fn matches(&self, text: &str) -> bool {
        self.0.as_ref().is_none_or(|re| re.is_match(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref().map_or("", Regex::as_str)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let source = String::deserialize(d)?;
        Pattern::new(&source).map_err(|e| D::Error::custom(format!("invalid regex {source:?}: {e}")))
    }
}

fn default_true() -> bool {
    true
}

fn default_selector() -> String {
    MAIN_CARD.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Handler {
    /// Fixed text.
    #[serde(rename = "text", alias = "Text")]
    Text {
        #[serde(default)]
        regex: Pattern,
        #[serde(default)]
        content: String,
    },

    /// File under `resources/query/local/`.
    #[serde(
        rename = "image",
        alias = "Image",
        alias = "local_image",
        alias = "LocalImage",
        alias = "image_local",
        alias = "ImageLocal"
    )]
    Image {
        #[serde(default)]
        regex: Pattern,
        #[serde(default)]
        src: String,
    },

    /// Remote image by URL, relative URLs resolved against the origin.
    #[serde(
        rename = "server_image",
        alias = "ServerImage",
        alias = "image_server",
        alias = "ImageServer",
        alias = "remote_image"
    )]
    ServerImage {
        #[serde(default)]
        regex: Pattern,
        #[serde(default)]
        url: String,
    },

    /// Captured page region with optional accompanying text.
    #[serde(rename = "remote_render")]
    RemoteRender {
        #[serde(default)]
        regex: Pattern,
        url: String,
        #[serde(default = "default_selector")]
        selector: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        ttl_secs: Option<i64>,
    },

    /// Wiki table render plus its public link.
    #[serde(rename = "server_table", alias = "ServerTable")]
    ServerTable {
        #[serde(default)]
        regex: Pattern,
        #[serde(default)]
        table_id: String,
    },

    /// Event calendar render.
    #[serde(rename = "schedule", alias = "Schedule")]
    Schedule {
        #[serde(default)]
        regex: Pattern,
    },

    /// Entity lookup with resource suffix modifiers.
    #[serde(
        rename = "wfo",
        alias = "WorldflipperObject",
        alias = "worldflipper_object",
        alias = "entity_lookup"
    )]
    EntityLookup {
        /// Require an exact alias; otherwise fuzzy guesses are accepted.
        #[serde(default = "default_true")]
        strict: bool,
        #[serde(default)]
        main_source: Option<String>,
    },

    /// Six character party code.
    #[serde(rename = "party_refer", alias = "PartyRefer")]
    PartyRefer {},

    /// Party search by free text with an optional trailing page number.
    #[serde(
        rename = "pps",
        alias = "party_search",
        alias = "PurePartySearcher",
        alias = "pure_party_searcher",
        alias = "PartySearcher",
        alias = "party_searcher"
    )]
    PartySearch {},

    /// Ordered sub-handlers whose results are concatenated.
    #[serde(rename = "composite", alias = "set")]
    Composite {
        #[serde(default)]
        regex: Pattern,
        #[serde(default, deserialize_with = "known_handlers")]
        handlers: Vec<Handler>,
    },
}

/// What a matching predicate hands to the producer.
#[derive(Debug, Clone)]
pub enum Matched {
    Text(String),
    Entity(EntityMatch),
    PartyPage(PartyPage),
    PartyCode(String),
}

impl Handler {
    /// Parses one config entry. Entries without a type tag or with an
    /// unknown one are skipped; a known tag with bad parameters is an error.
    pub fn from_entry(entry: Value) -> Result<Option<Handler>, serde_json::Error> {
        let tag = match entry.get("type").and_then(Value::as_str) {
            Some(tag) if !tag.is_empty() => tag,
            _ => {
                debug!("skipping handler entry without a type");
                return Ok(None);
            }
        };
        if !KNOWN_TAGS.contains(&tag) {
            error!(tag = %tag, "unknown handler type, skipping");
            return Ok(None);
        }
        serde_json::from_value(entry).map(Some)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Handler::Text { .. } => "text",
            Handler::Image { .. } => "image",
            Handler::ServerImage { .. } => "server_image",
            Handler::RemoteRender { .. } => "remote_render",
            Handler::ServerTable { .. } => "server_table",
            Handler::Schedule { .. } => "schedule",
            Handler::EntityLookup { .. } => "entity_lookup",
            Handler::PartyRefer {} => "party_refer",
            Handler::PartySearch {} => "party_search",
            Handler::Composite { .. } => "composite",
        }
    }

    /// Evaluates the predicate.
    pub async fn check(&self, text: &str, ctx: &QueryContext) -> QueryResult<Option<Matched>> {
        let matched = match self {
            Handler::Text { regex, .. }
            | Handler::Image { regex, .. }
            | Handler::ServerImage { regex, .. }
            | Handler::RemoteRender { regex, .. }
            | Handler::ServerTable { regex, .. }
            | Handler::Schedule { regex }
            | Handler::Composite { regex, .. } => regex.matches(text).then(|| Matched::Text(text.to_string())),
            Handler::EntityLookup { strict, main_source } => {
                entity_lookup::resolve(text, *strict, main_source.as_deref(), ctx).map(Matched::Entity)
            }
            Handler::PartyRefer {} => party::party_code(text).map(Matched::PartyCode),
            Handler::PartySearch {} => party::probe(text, ctx).await.map(Matched::PartyPage),
        };
        Ok(matched)
    }

    /// Runs the producer for a matched predicate. `None` and empty cards
    /// both mean "no answer".
    pub async fn produce(&self, matched: Matched, ctx: &QueryContext) -> QueryResult<Option<Card>> {
        let cache = &ctx.cache;
        match (self, matched) {
            (Handler::Text { content, .. }, _) => Ok(Some(Card::text(content.clone()))),
            (Handler::Image { src, .. }, _) => {
                if src.is_empty() {
                    return Ok(None);
                }
                image_card(cache.local_file(&Path::new("query/local").join(src)).await, src)
            }
            (Handler::ServerImage { url, .. }, _) => {
                if url.is_empty() {
                    return Ok(None);
                }
                let url = cache.origin_url(url);
                let suffix = if url.ends_with(".gif") { "gif" } else { "png" };
                let key = ResourceKey::adhoc("server_image", &url, suffix);
                let acquire = Arc::new(cache.remote(url.clone()));
                image_card(cache.get_with(&key, cache.default_ttl(), acquire, Encoding::Canonical).await, &url)
            }
            (
                Handler::RemoteRender {
                    url,
                    selector,
                    text,
                    ttl_secs,
                    ..
                },
                _,
            ) => {
                let url = cache.origin_url(url);
                let ttl = ttl_secs.map_or_else(|| cache.default_ttl(), Ttl::from_secs);
                let request = cache.render_request(url.clone(), selector.clone());
                let image = cached_render(ctx, "render", &format!("{url} {selector}"), request, ttl).await;
                let mut card = Card::text(text.clone().unwrap_or_default());
                if let Some(image) = image_card(image, &url)? {
                    card.merge(image);
                }
                Ok(Some(card))
            }
            (Handler::ServerTable { table_id, .. }, _) => {
                if table_id.is_empty() {
                    return Ok(None);
                }
                let id = urlencoding::encode(table_id);
                let url = cache.origin_url(&format!("/card/table/?table_id={id}&show_replacements=true"));
                let request = cache.render_request(url.clone(), ".table");
                let image = cached_render(ctx, "table", table_id, request, cache.default_ttl()).await;
                let mut card = Card::text(cache.origin_url(&format!("/table/{id}")));
                if let Some(image) = image_card(image, &url)? {
                    card.merge(image);
                }
                Ok(Some(card))
            }
            (Handler::Schedule { .. }, _) => {
                let url = cache.origin().calendar_url.clone();
                let request = cache
                    .render_request(url.clone(), MAIN_CARD)
                    .wait_until(WaitUntil::Load)
                    .click_at(440, 195);
                image_card(
                    cached_render(ctx, "schedule", "calendar", request, cache.default_ttl()).await,
                    &url,
                )
            }
            (Handler::EntityLookup { .. }, Matched::Entity(found)) => entity_lookup::produce(found, ctx).await,
            (Handler::PartyRefer {}, Matched::PartyCode(code)) => Ok(party::refer_card(&code, ctx).await),
            (Handler::PartySearch {}, Matched::PartyPage(page)) => party::search_card(&page, ctx).await,
            (Handler::Composite { handlers, .. }, Matched::Text(text)) => {
                let mut combined: Option<Card> = None;
                for handler in handlers {
                    if let Some(card) = handler.run(&text, ctx).await? {
                        match combined.as_mut() {
                            Some(all) => all.merge(card),
                            None => combined = Some(card),
                        }
                    }
                }
                Ok(combined)
            }
            (handler, matched) => {
                debug!(kind = handler.kind(), ?matched, "predicate result does not fit handler");
                Ok(None)
            }
        }
    }

    /// Predicate then producer; `Some` only for a non-empty card.
    pub fn run<'a>(&'a self, text: &'a str, ctx: &'a QueryContext) -> BoxFuture<'a, QueryResult<Option<Card>>> {
        async move {
            let Some(matched) = self.check(text, ctx).await? else {
                return Ok(None);
            };
            let card = self.produce(matched, ctx).await?;
            Ok(card.filter(|c| !c.is_empty()))
        }
        .boxed()
    }
}

fn known_handlers<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Handler>, D::Error> {
    let entries = Vec::<Value>::deserialize(d)?;
    let mut handlers = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(handler) = Handler::from_entry(entry).map_err(D::Error::custom)? {
            handlers.push(handler);
        }
    }
    Ok(handlers)
}

pub(crate) async fn cached_render(
    ctx: &QueryContext,
    namespace: &str,
    logical_key: &str,
    request: RenderRequest,
    ttl: Ttl,
) -> ResourceResult<Bytes> {
    let key = ResourceKey::adhoc(namespace, logical_key, "png");
    let acquire = Arc::new(ctx.cache.renderer(request));
    ctx.cache.get_with(&key, ttl, acquire, Encoding::Canonical).await
}

/// Image card from a resource result. Fall-through errors mean "no answer";
/// anything else is surfaced.
pub(crate) fn image_card(result: ResourceResult<Bytes>, what: &str) -> QueryResult<Option<Card>> {
    match result {
        Ok(bytes) => Ok(Some(Card::image(bytes))),
        Err(e) if e.is_fallthrough() => {
            debug!(resource = %what, error = %e, "resource unavailable, falling through");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
