//! Parameter-key normalization and the protected parameter registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Keys whose values are kept byte-for-byte when no registry is configured
pub const DEFAULT_PROTECTED_KEYS: &[&str] = &[
    "image",
    "glyph",
    "glyphe",
    "icon",
    "icone",
    "logo",
    "class",
    "type de page",
];

/// Fold a parameter key for comparison.
///
/// Diacritics are stripped, case is lowered, underscores count as spaces and
/// whitespace runs collapse to one space: `" Type_de  Pagé "` → `"type de page"`.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    let folded: String = key
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c == '_' { ' ' } else { c })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Set of parameter keys whose values must survive transformation unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedParams {
    keys: BTreeSet<String>,
}

impl ProtectedParams {
    /// Registry holding exactly `keys` (normalized)
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|k| normalize_key(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Empty registry: nothing is restored
    #[must_use]
    pub fn none() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: &str) -> Self {
        self.insert(key);
        self
    }

    pub fn insert(&mut self, key: &str) -> bool {
        let key = normalize_key(key);
        !key.is_empty() && self.keys.insert(key)
    }

    /// Whether `key` (raw or normalized) is protected
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(&normalize_key(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for ProtectedParams {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_KEYS)
    }
}
