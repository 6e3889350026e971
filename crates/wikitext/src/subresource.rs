//! References to sub-resources (JSON data pages) held in template parameters.

use crate::params::normalize_key;
use crate::parser::parse;
use crate::placeholder::{PlaceholderAllocator, PlaceholderRole};
use regex::Regex;
use std::collections::HashMap;

/// Parameter key whose value names a JSON sub-resource
pub const DEFAULT_SUBRESOURCE_KEY: &str = "json";

/// Raw reference strings held by `json=` parameters, in document order
#[must_use]
pub fn extract_subresource_refs(text: &str) -> Vec<String> {
    extract_refs_with_key(text, DEFAULT_SUBRESOURCE_KEY)
}

/// Raw values of every parameter whose normalized key equals `reserved_key`.
///
/// Unparseable input yields an empty list.
#[must_use]
pub fn extract_refs_with_key(text: &str, reserved_key: &str) -> Vec<String> {
    let code = match parse(text) {
        Ok(code) => code,
        Err(e) => {
            log::warn!("Sub-resource extraction skipped: {e}");
            return Vec::new();
        }
    };

    let reserved = normalize_key(reserved_key);
    code.templates()
        .into_iter()
        .flat_map(|t| t.params.iter())
        .filter(|p| p.key().is_some_and(|k| normalize_key(k) == reserved))
        .map(|p| p.value.to_string().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// For `Base/Name.json`, the subpage name `Name`; `None` when the reference
/// has no `/` or does not end in `.json`.
#[must_use]
pub fn json_subpage_name(raw: &str) -> Option<&str> {
    let (_, file) = raw.rsplit_once('/')?;
    let stem_len = file.len().checked_sub(".json".len())?;
    file.get(stem_len..)
        .filter(|ext| ext.eq_ignore_ascii_case(".json"))
        .map(|_| &file[..stem_len])
}

/// Target path `target_title/translated_name.json` for an eligible reference.
///
/// `None` means the reference keeps its raw path.
#[must_use]
pub fn json_subpage_target(raw: &str, target_title: &str, translated_name: &str) -> Option<String> {
    json_subpage_name(raw)?;
    Some(format!("{target_title}/{translated_name}.json"))
}

/// Placeholders standing in for sub-resource references during transformation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubresourcePlaceholders {
    /// (placeholder, raw reference)
    entries: Vec<(String, String)>,
}

impl SubresourcePlaceholders {
    /// One placeholder per distinct movable reference (`Base/Name.json`),
    /// avoiding tokens already in `text`.
    ///
    /// Other references stay literal: their value may be an ordinary word
    /// that also occurs in prose.
    #[must_use]
    pub fn for_document(text: &str, refs: &[String]) -> Self {
        let mut alloc = PlaceholderAllocator::for_source(text);
        let mut entries: Vec<(String, String)> = Vec::new();
        for raw in refs {
            if json_subpage_name(raw).is_none() || entries.iter().any(|(_, r)| r == raw) {
                continue;
            }
            entries.push((alloc.allocate(PlaceholderRole::Subresource), raw.clone()));
        }
        Self { entries }
    }

    #[must_use]
    pub fn placeholder_for(&self, raw: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, r)| r == raw)
            .map(|(p, _)| p.as_str())
    }

    /// Raw references in allocation order
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, r)| r.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every occurrence of each reference with its placeholder.
    ///
    /// Single pass, longer references first, so one that contains another
    /// stays whole and inserted placeholders are never rewritten.
    #[must_use]
    pub fn protect(&self, text: &str) -> String {
        let pairs: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(placeholder, raw)| (raw.as_str(), placeholder.as_str()))
            .collect();
        replace_all_once(text, &pairs)
    }

    /// Replace placeholders with caller-chosen targets keyed by raw reference.
    ///
    /// A reference without a target gets its raw path back.
    #[must_use]
    pub fn substitute(&self, text: &str, targets: &HashMap<String, String>) -> String {
        let pairs: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(placeholder, raw)| {
                let target = targets.get(raw).unwrap_or(raw);
                (placeholder.as_str(), target.as_str())
            })
            .collect();
        replace_all_once(text, &pairs)
    }
}

/// Replace each `from` with its `to` in one left-to-right scan; replacements
/// are never rescanned. Longer needles win at the same position.
fn replace_all_once(text: &str, pairs: &[(&str, &str)]) -> String {
    let mut ordered: Vec<&(&str, &str)> = pairs.iter().filter(|(from, _)| !from.is_empty()).collect();
    if ordered.is_empty() {
        return text.to_string();
    }
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let pattern = ordered
        .iter()
        .map(|(from, _)| regex::escape(from))
        .collect::<Vec<_>>()
        .join("|");
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            log::warn!("Sub-resource references left unprotected: {e}");
            return text.to_string();
        }
    };
    let lookup: HashMap<&str, &str> = ordered.into_iter().copied().collect();
    re.replace_all(text, |caps: &regex::Captures<'_>| {
        lookup.get(&caps[0]).copied().unwrap_or(&caps[0]).to_string()
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_json_params_in_order() {
        let text = "{{Chart|json=Main/Data.json}} {{Map| JSON = Main/Geo.json }} {{Other|data=x.json}}";
        assert_eq!(
            extract_subresource_refs(text),
            vec!["Main/Data.json", "Main/Geo.json"]
        );
    }

    #[test]
    fn nested_templates_are_searched() {
        let text = "{{Box|content={{Chart|json=A/B.json}}}}";
        assert_eq!(extract_subresource_refs(text), vec!["A/B.json"]);
    }

    #[test]
    fn custom_key_and_empty_values() {
        let text = "{{Chart|data=A/B.json|data=}}";
        assert_eq!(extract_refs_with_key(text, "Data"), vec!["A/B.json"]);
    }

    #[test]
    fn unparseable_text_yields_nothing() {
        let depth = crate::parser::MAX_NESTING + 1;
        let text = format!("{}json=a{}", "{{a|".repeat(depth), "}}".repeat(depth));
        assert!(extract_subresource_refs(&text).is_empty());
    }

    #[test]
    fn subpage_names() {
        assert_eq!(json_subpage_name("Main/Data.json"), Some("Data"));
        assert_eq!(json_subpage_name("Main/Sub/Data.JSON"), Some("Data"));
        assert_eq!(json_subpage_name("Data.json"), None);
        assert_eq!(json_subpage_name("Main/Data.txt"), None);
        assert_eq!(json_subpage_name("Main/é"), None);
        assert_eq!(
            json_subpage_target("Blé/Rendement.json", "Wheat", "Yield").as_deref(),
            Some("Wheat/Yield.json")
        );
        assert_eq!(json_subpage_target("Data.json", "Wheat", "Yield"), None);
    }

    #[test]
    fn protect_and_substitute() {
        let text = "{{Chart|json=Main/Data.json}} see Main/Data.json";
        let refs = extract_subresource_refs(text);
        let placeholders = SubresourcePlaceholders::for_document(text, &refs);

        let protected = placeholders.protect(text);
        assert_eq!(protected, "{{Chart|json=⟪JSON_PATH_0⟫}} see ⟪JSON_PATH_0⟫");

        let targets = HashMap::from([("Main/Data.json".to_string(), "Main/Data_en.json".to_string())]);
        assert_eq!(
            placeholders.substitute(&protected, &targets),
            "{{Chart|json=Main/Data_en.json}} see Main/Data_en.json"
        );
        assert_eq!(placeholders.substitute(&protected, &HashMap::new()), text);
    }

    #[test]
    fn only_movable_references_are_protected() {
        let text = "{{Chart|json=data}} The data shows {{Databox}} {{Map|json=Geo/Map.json}}";
        let refs = extract_subresource_refs(text);
        assert_eq!(refs, vec!["data", "Geo/Map.json"]);

        let placeholders = SubresourcePlaceholders::for_document(text, &refs);
        assert_eq!(placeholders.references().collect::<Vec<_>>(), vec!["Geo/Map.json"]);
        assert_eq!(
            placeholders.protect(text),
            "{{Chart|json=data}} The data shows {{Databox}} {{Map|json=⟪JSON_PATH_0⟫}}"
        );
    }

    #[test]
    fn inserted_placeholders_are_not_rewritten() {
        let text = "{{Chart|json=A/B.json}} {{Chart|json=X/0.json}} year 2020 X/0.json";
        let refs = extract_subresource_refs(text);
        let placeholders = SubresourcePlaceholders::for_document(text, &refs);

        let protected = placeholders.protect(text);
        assert_eq!(
            protected,
            "{{Chart|json=⟪JSON_PATH_0⟫}} {{Chart|json=⟪JSON_PATH_1⟫}} year 2020 ⟪JSON_PATH_1⟫"
        );

        let targets = HashMap::from([("A/B.json".to_string(), "T/B.json".to_string())]);
        assert_eq!(
            placeholders.substitute(&protected, &targets),
            "{{Chart|json=T/B.json}} {{Chart|json=X/0.json}} year 2020 X/0.json"
        );
    }

    #[test]
    fn short_reference_inside_placeholder_text_is_harmless() {
        // A reference made of placeholder characters must not reach into
        // placeholders inserted in the same pass.
        let placeholders = SubresourcePlaceholders {
            entries: vec![
                ("⟪JSON_PATH_0⟫".to_string(), "A/B.json".to_string()),
                ("⟪JSON_PATH_1⟫".to_string(), "0".to_string()),
            ],
        };
        let protected = placeholders.protect("A/B.json 2020");
        assert_eq!(protected, "⟪JSON_PATH_0⟫ 2⟪JSON_PATH_1⟫2⟪JSON_PATH_1⟫");

        let targets = HashMap::from([("A/B.json".to_string(), "T/B.json".to_string())]);
        assert_eq!(placeholders.substitute(&protected, &targets), "T/B.json 2020");
    }

    #[test]
    fn longer_reference_is_protected_first() {
        let refs = vec!["A/B.json".to_string(), "X/A/B.json".to_string()];
        let placeholders = SubresourcePlaceholders::for_document("", &refs);
        let protected = placeholders.protect("A/B.json X/A/B.json");
        assert_eq!(protected, "⟪JSON_PATH_0⟫ ⟪JSON_PATH_1⟫");
    }
}
