//! Turning pipeline output into the card handed to the presentation layer.

use crate::error::QueryError;
use anise_model::Card;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub const MSG_GUESS: &str = "query.guess";
pub const MSG_FAILED: &str = "query.failed";
pub const MSG_ERROR: &str = "query.error";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum MessageValue {
    One(String),
    Many(Vec<String>),
}

/// User-facing message templates keyed by message id.
///
/// Values are a string or a list of strings (the first entry is used).
/// Unknown keys render as the key itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTable {
    entries: HashMap<String, MessageValue>,
}

impl MessageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `path`. A missing or malformed file yields an empty table;
    /// entries of any other shape are skipped.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read message table");
                return Self::new();
            }
        };
        let raw: HashMap<String, Value> = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed message table");
                return Self::new();
            }
        };
        let entries = raw
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value(value) {
                Ok(message) => Some((key, message)),
                Err(_) => {
                    warn!(key = %key, "skipping message entry that is neither a string nor a list");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), MessageValue::One(value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> String {
        match self.entries.get(key) {
            Some(MessageValue::One(s)) => s.clone(),
            Some(MessageValue::Many(list)) => list.first().cloned().unwrap_or_else(|| key.to_string()),
            None => key.to_string(),
        }
    }

    /// The message for `key` with each `{name}` placeholder replaced.
    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> String {
        vars.iter().fold(self.get(key), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
    }
}

/// Composes the final [`Card`] for the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct ResponseAssembler {
    messages: Arc<MessageTable>,
}

impl ResponseAssembler {
    pub fn new(messages: Arc<MessageTable>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &MessageTable {
        &self.messages
    }

    /// Maps the pipeline's no-result signal to the failure card.
    pub fn finish(&self, card: Option<Card>) -> Card {
        card.unwrap_or_else(|| self.failed())
    }

    pub fn failed(&self) -> Card {
        Card::failed(self.messages.get(MSG_FAILED))
    }

    /// Generic card for an error caught at the dispatch boundary. The error
    /// itself is not shown to the user.
    pub fn error(&self, _error: &QueryError) -> Card {
        Card::failed(self.messages.get(MSG_ERROR))
    }

    /// Note prepended to a card answered by a fuzzy match.
    pub fn guess_note(&self, matched_alias: &str) -> String {
        self.messages.render(MSG_GUESS, &[("guess_content", matched_alias)])
    }
}
