//! Nickname index: exact prefix-tree lookup plus a fuzzy fallback.
//!
//! Keys are normalized with the index's [`NameNormalizer`] on insert and on
//! lookup. Alias strings are unique across the index; the first registration
//! of a key wins and later conflicting registrations are logged and rejected.

use crate::normalize::NameNormalizer;
use anise_model::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Score of an alias identical to the normalized query.
pub const EXACT_SCORE: u8 = 100;

/// Guess handlers accept fuzzy scores strictly above this value.
pub const GUESS_SCORE: u8 = 60;

/// Call-site thresholds applied to fuzzy scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    pub exact: u8,
    pub guess: u8,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            exact: EXACT_SCORE,
            guess: GUESS_SCORE,
        }
    }
}

impl MatchThresholds {
    pub fn is_exact(&self, score: u8) -> bool {
        score >= self.exact
    }

    pub fn accepts_guess(&self, score: u8) -> bool {
        score > self.guess
    }
}

/// Best fuzzy candidate for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub id: EntityId,
    /// Similarity in `0..=100`; 100 only for an identical key.
    pub score: u8,
    /// The normalized alias that matched.
    pub alias: String,
}

/// Result of [`AliasIndex::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    /// Alias already pointed at the same id.
    Unchanged,
    /// Alias already pointed at another id, which is kept.
    Conflict { existing: EntityId },
    /// Alias normalized to the empty string.
    Empty,
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    entry: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    normalizer: NameNormalizer,
    root: TrieNode,
    /// Registration order, used for fuzzy tie-breaks and enumeration.
    entries: Vec<(String, EntityId)>,
    by_id: HashMap<EntityId, Vec<usize>>,
}

impl AliasIndex {
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self {
            normalizer,
            ..Self::default()
        }
    }

    pub fn normalizer(&self) -> &NameNormalizer {
        &self.normalizer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All `(alias, id)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityId)> {
        self.entries.iter().map(|(a, id)| (a.as_str(), id))
    }

    pub fn add(&mut self, alias: &str, id: &EntityId) -> AddOutcome {
        let key = self.normalizer.normalize(alias);
        if key.is_empty() {
            return AddOutcome::Empty;
        }

        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.entry(c).or_default();
        }

        if let Some(existing) = node.entry {
            let existing_id = &self.entries[existing].1;
            if existing_id == id {
                return AddOutcome::Unchanged;
            }
            warn!(
                alias = %key,
                existing = %existing_id,
                rejected = %id,
                "duplicate alias, keeping first registration"
            );
            return AddOutcome::Conflict {
                existing: existing_id.clone(),
            };
        }

        let index = self.entries.len();
        node.entry = Some(index);
        self.entries.push((key, id.clone()));
        self.by_id.entry(id.clone()).or_default().push(index);
        AddOutcome::Inserted
    }

    pub fn resolve_exact(&self, text: &str) -> Option<EntityId> {
        let key = self.normalizer.normalize(text);
        self.lookup_normalized(&key)
            .map(|i| self.entries[i].1.clone())
    }

    /// Best-scoring alias for `text`, or `None` when the index or the
    /// normalized query is empty.
    ///
    /// Scores are normalized Levenshtein similarity scaled to `0..=100`. Only
    /// an identical key scores 100. Ties keep the first-registered alias.
    pub fn resolve_fuzzy(&self, text: &str) -> Option<FuzzyMatch> {
        let key = self.normalizer.normalize(text);
        if key.is_empty() {
            return None;
        }
        if let Some(i) = self.lookup_normalized(&key) {
            let (alias, id) = &self.entries[i];
            return Some(FuzzyMatch {
                id: id.clone(),
                score: EXACT_SCORE,
                alias: alias.clone(),
            });
        }

        let mut best: Option<(usize, u8)> = None;
        for (i, (alias, _)) in self.entries.iter().enumerate() {
            let score = similarity(&key, alias);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }

        best.map(|(i, score)| {
            let (alias, id) = &self.entries[i];
            FuzzyMatch {
                id: id.clone(),
                score,
                alias: alias.clone(),
            }
        })
    }

    /// Aliases registered for `id`, in registration order.
    pub fn nicknames(&self, id: &EntityId) -> Vec<&str> {
        self.by_id
            .get(id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| self.entries[i].0.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Aliases starting with the normalized `prefix`, in registration order.
    pub fn with_prefix(&self, prefix: &str) -> Vec<(&str, &EntityId)> {
        let key = self.normalizer.normalize(prefix);
        let Some(node) = self.walk(&key) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if let Some(i) = n.entry {
                found.push(i);
            }
            stack.extend(n.children.values());
        }
        found.sort_unstable();
        found
            .into_iter()
            .map(|i| (self.entries[i].0.as_str(), &self.entries[i].1))
            .collect()
    }

    fn walk(&self, key: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for c in key.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    fn lookup_normalized(&self, key: &str) -> Option<usize> {
        if key.is_empty() {
            return None;
        }
        self.walk(key)?.entry
    }
}

/// Similarity of two normalized keys in `0..=100`.
fn similarity(a: &str, b: &str) -> u8 {
    if a == b {
        return EXACT_SCORE;
    }
    let scaled = (strsim::normalized_levenshtein(a, b) * 100.0).round();
    // Rounding can reach 100 for long, nearly equal keys.
    (scaled as u8).min(EXACT_SCORE - 1)
}
