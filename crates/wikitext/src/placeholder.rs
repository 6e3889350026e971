//! Opaque placeholder tokens and their mapping back to original text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Opening delimiter of every placeholder
pub const OPEN: char = '⟪';
/// Closing delimiter of every placeholder
pub const CLOSE: char = '⟫';

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"⟪[A-Z]+(?:_[A-Z]+)*_[0-9]+⟫")
        .unwrap_or_else(|e| panic!("invalid placeholder pattern: {e}"))
});

/// What a placeholder stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderRole {
    TemplateName,
    ParamKey,
    Subresource,
}

impl PlaceholderRole {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::TemplateName => "TPL",
            Self::ParamKey => "KEY",
            Self::Subresource => "JSON_PATH",
        }
    }
}

/// Hands out placeholders from one counter, skipping any that already
/// occur in the source text.
#[derive(Debug)]
pub struct PlaceholderAllocator<'a> {
    next: usize,
    source: Option<&'a str>,
}

impl<'a> PlaceholderAllocator<'a> {
    /// Allocator for placeholders that will be inserted into `source`
    #[must_use]
    pub fn for_source(source: &'a str) -> Self {
        Self {
            next: 0,
            source: source.contains(OPEN).then_some(source),
        }
    }

    pub fn allocate(&mut self, role: PlaceholderRole) -> String {
        loop {
            let candidate = format!("{OPEN}{}_{}{CLOSE}", role.tag(), self.next);
            self.next += 1;
            if !self.source.is_some_and(|s| s.contains(&candidate)) {
                return candidate;
            }
        }
    }
}

/// Placeholder → original text, for one masking pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlaceholderMap {
    entries: BTreeMap<String, String>,
}

impl PlaceholderMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placeholder: String, original: String) {
        self.entries.insert(placeholder, original);
    }

    #[must_use]
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries.get(placeholder).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every placeholder in `text` with its original, longest first
    #[must_use]
    pub fn restore(&self, text: &str) -> String {
        let mut ordered: Vec<(&String, &String)> = self.entries.iter().collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        ordered
            .into_iter()
            .fold(text.to_string(), |acc, (placeholder, original)| {
                if acc.contains(placeholder.as_str()) {
                    acc.replace(placeholder.as_str(), original)
                } else {
                    acc
                }
            })
    }

    /// Placeholders of this map that do not occur in `text`
    #[must_use]
    pub fn missing_from(&self, text: &str) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|p| !text.contains(p.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Placeholder-shaped tokens left in `text`
#[must_use]
pub fn find_placeholders(text: &str) -> Vec<&str> {
    PLACEHOLDER.find_iter(text).map(|m| m.as_str()).collect()
}
