//! Text normalization for alias keys and raw queries.

use crate::error::{CatalogError, CatalogResult};
use std::collections::HashMap;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Canonicalizes alias strings before they are indexed or looked up.
///
/// Performs:
/// - Unicode NFKC fold (full-width forms collapse to ASCII)
/// - Lowercase conversion
/// - Optional per-character script fold (e.g. Traditional → Simplified)
/// - Trim surrounding whitespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameNormalizer {
    fold: HashMap<char, char>,
}

impl NameNormalizer {
    /// A normalizer without a script fold table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fold_table(fold: HashMap<char, char>) -> Self {
        Self { fold }
    }

    /// Loads a fold table from a JSON object of single-character pairs.
    ///
    /// A missing file yields an empty table. Entries whose key or value is
    /// not exactly one character are skipped.
    pub fn load_fold_table(path: &Path) -> CatalogResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(CatalogError::io(path, e)),
        };
        let raw: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|e| CatalogError::malformed(path, e))?;

        let fold = raw
            .iter()
            .filter_map(|(from, to)| Some((single_char(from)?, single_char(to)?)))
            .collect();
        Ok(Self { fold })
    }

    pub fn fold_len(&self) -> usize {
        self.fold.len()
    }

    pub fn normalize(&self, s: &str) -> String {
        let folded: String = s
            .nfkc()
            .flat_map(char::to_lowercase)
            .map(|c| self.fold.get(&c).copied().unwrap_or(c))
            .collect();
        folded.trim().to_string()
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// Light normalization applied to raw query text before dispatch.
///
/// NFKC plus whitespace collapsing; case is preserved because some handlers
/// (party codes) are case-sensitive.
pub fn normalize_query(s: &str) -> String {
    let folded: String = s.nfkc().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
