//! Cheap structural checks between a source page and its transformation.

use crate::placeholder::find_placeholders;
use serde::Serialize;
use std::fmt;

/// Number of `{{` and `}}` pairs in `text`
#[must_use]
pub fn count_braces(text: &str) -> (usize, usize) {
    (text.matches("{{").count(), text.matches("}}").count())
}

/// Brace balance of both texts and placeholders left in the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    pub original_braces: (usize, usize),
    pub translated_braces: (usize, usize),
    pub leftover_placeholders: Vec<String>,
}

impl StructureReport {
    #[must_use]
    pub fn compare(original: &str, translated: &str) -> Self {
        Self {
            original_braces: count_braces(original),
            translated_braces: count_braces(translated),
            leftover_placeholders: find_placeholders(translated)
                .into_iter()
                .filter(|p| !original.contains(p))
                .map(str::to_string)
                .collect(),
        }
    }

    #[must_use]
    pub fn braces_match(&self) -> bool {
        self.original_braces == self.translated_braces
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.braces_match() && self.leftover_placeholders.is_empty()
    }
}

impl fmt::Display for StructureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (oo, oc) = self.original_braces;
        let (to, tc) = self.translated_braces;
        write!(f, "Braces: {oo}/{oc} -> {to}/{tc}")?;
        if !self.leftover_placeholders.is_empty() {
            write!(f, " | Unresolved: {}", self.leftover_placeholders.join(", "))?;
        }
        Ok(())
    }
}
