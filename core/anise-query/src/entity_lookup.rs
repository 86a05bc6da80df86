//! Entity lookup: trailing resource modifiers, alias resolution and the
//! resource fetch for the matched entity.

use crate::error::QueryResult;
use crate::handler::{QueryContext, image_card};
use anise_catalog::FuzzyMatch;
use anise_model::{Card, CardStatus, EntityId, EntityKind, EntityView};
use tracing::debug;

/// Resource group used when the query carries no modifier.
pub const DEFAULT_GROUP: &str = "wikicard";

/// Trailing modifiers and the resource group each selects. Checked in
/// order, so longer suffixes sharing a tail come first.
pub const SUFFIX_MODIFIERS: &[(&str, &str)] = &[
    ("觉醒立绘", "full_shot_1"),
    ("立绘", "full_shot_0"),
    ("pasp", "pixelart/special"),
    ("pawf", "pixelart/walk_front"),
    ("pakc", "pixelart/kachidoki"),
];

/// Splits a trailing modifier off `text`, returning the remaining name and
/// the selected resource group.
pub fn split_modifier(text: &str) -> (&str, &'static str) {
    SUFFIX_MODIFIERS
        .iter()
        .find_map(|(suffix, group)| text.strip_suffix(suffix).map(|rest| (rest.trim_end(), *group)))
        .unwrap_or((text, DEFAULT_GROUP))
}

/// A resolved entity and the resource to show for it.
#[derive(Debug, Clone)]
pub struct EntityMatch {
    pub entity: EntityView,
    pub group: &'static str,
    /// Set when the entity was found by a fuzzy guess.
    pub guess: Option<FuzzyMatch>,
}

/// Resolves `text` to an entity. `uid101` / `aid7` address an id directly;
/// otherwise aliases are consulted, exactly when `strict`, else with fuzzy
/// guesses above the guess threshold.
pub fn resolve(text: &str, strict: bool, main_source: Option<&str>, ctx: &QueryContext) -> Option<EntityMatch> {
    let (name, group) = split_modifier(text);
    if name.is_empty() {
        return None;
    }

    let (id, guess) = match EntityId::parse_query(name) {
        Some(id) => (id, None),
        None if strict => (ctx.catalog.resolve_exact(name)?, None),
        None => {
            let found = ctx.catalog.resolve_fuzzy(name)?;
            if ctx.thresholds.is_exact(found.score) {
                (found.id, None)
            } else if ctx.thresholds.accepts_guess(found.score) {
                (found.id.clone(), Some(found))
            } else {
                debug!(query = %name, alias = %found.alias, score = found.score, "best alias below guess threshold");
                return None;
            }
        }
    };

    let Some(entity) = ctx.catalog.get(&id, main_source) else {
        debug!(id = %id, "alias points at an entity no source provides");
        return None;
    };
    // Equipment only has wiki cards.
    let group = match entity.kind() {
        EntityKind::Character => group,
        EntityKind::Equipment => DEFAULT_GROUP,
    };
    Some(EntityMatch { entity, group, guess })
}

pub async fn produce(found: EntityMatch, ctx: &QueryContext) -> QueryResult<Option<Card>> {
    let what = format!("{} {}", found.entity.id, found.group);
    let Some(mut card) = image_card(ctx.cache.get(&found.entity, found.group, None).await, &what)? else {
        return Ok(None);
    };
    if let Some(guess) = found.guess {
        card.text = ctx.assembler.guess_note(&guess.alias);
        card.status = CardStatus::Guess;
    }
    Ok(Some(card))
}
