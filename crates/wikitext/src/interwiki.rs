//! Interlanguage link markers (`[[en:Title]]`) at the foot of a page.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static INTERWIKI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[:?([a-z]{2,3}(?:-[a-z0-9]+)*):([^\]\[|]+)\]\]")
        .unwrap_or_else(|e| panic!("invalid interwiki pattern: {e}"))
});

/// `[[lang:title]]`
#[must_use]
pub fn interwiki_marker(lang: &str, title: &str) -> String {
    format!("[[{lang}:{title}]]")
}

/// Language → title for every interwiki marker in `text`; the first marker
/// for a language wins.
#[must_use]
pub fn interwiki_links(text: &str) -> BTreeMap<String, String> {
    let mut links = BTreeMap::new();
    for caps in INTERWIKI.captures_iter(text) {
        links
            .entry(caps[1].to_string())
            .or_insert_with(|| caps[2].trim().to_string());
    }
    links
}

/// Make `text` carry `[[lang:title]]`.
///
/// An existing marker for `lang` is replaced in place; otherwise the marker
/// goes on its own line at the end. Returns `None` when the exact marker is
/// already present and no edit is needed.
#[must_use]
pub fn upsert_interwiki_link(text: &str, lang: &str, title: &str) -> Option<String> {
    let marker = interwiki_marker(lang, title);
    if text.contains(&marker) {
        return None;
    }

    if let Some(existing) = INTERWIKI.captures_iter(text).find(|c| &c[1] == lang) {
        let span = existing.get(0)?.range();
        let mut updated = String::with_capacity(text.len() + marker.len());
        updated.push_str(&text[..span.start]);
        updated.push_str(&marker);
        updated.push_str(&text[span.end..]);
        return Some(updated);
    }

    let sep = if text.is_empty() || text.ends_with('\n') { "" } else { "\n" };
    Some(format!("{text}{sep}{marker}\n"))
}
