//! Positional restoration of protected parameter values.
//!
//! A template is identified by its occurrence index (pre-order position in
//! the document) and a parameter by its normalized key. Both documents must
//! keep the same template layout for the correlation to hold; nothing here
//! detects a transformation that inserted, dropped or reordered templates.

use crate::ast::{Node, Wikicode};
use crate::params::{normalize_key, ProtectedParams};
use crate::parser::parse;
use std::collections::HashMap;

/// (occurrence index, normalized key, n-th use of that key in the template)
type Slot = (usize, String, usize);

/// Overwrite protected parameter values in `transformed` with the values
/// found at the same position in `original`.
///
/// Returns `transformed` unchanged when either text fails to parse.
#[must_use]
pub fn restore_protected_values(
    original: &str,
    transformed: &str,
    protected: &ProtectedParams,
) -> String {
    if protected.is_empty() {
        return transformed.to_string();
    }

    let (source, mut target) = match (parse(original), parse(transformed)) {
        (Ok(source), Ok(target)) => (source, target),
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("Protected values not restored: {e}");
            return transformed.to_string();
        }
    };

    let originals = collect_protected(&source, protected);
    if originals.is_empty() {
        return transformed.to_string();
    }

    let mut occurrence = 0;
    let restored = restore_in(&mut target, &originals, protected, &mut occurrence);
    log::debug!("Restored {restored} protected parameter value(s)");
    target.to_string()
}

fn collect_protected(code: &Wikicode, protected: &ProtectedParams) -> HashMap<Slot, Wikicode> {
    let mut originals = HashMap::new();
    for (occurrence, template) in code.templates().into_iter().enumerate() {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for param in &template.params {
            let Some(key) = param.key().filter(|k| protected.contains(k)) else {
                continue;
            };
            let key = normalize_key(key);
            let nth = seen.entry(key.clone()).or_default();
            originals.insert((occurrence, key, *nth), param.value.clone());
            *nth += 1;
        }
    }
    originals
}

/// Walk templates in pre-order, counting occurrences as they will appear in
/// the output. A restored value contributes the templates it contains, so a
/// second pass over the output sees the same indices.
fn restore_in(
    code: &mut Wikicode,
    originals: &HashMap<Slot, Wikicode>,
    protected: &ProtectedParams,
    occurrence: &mut usize,
) -> usize {
    let mut restored = 0;
    for node in &mut code.nodes {
        let Node::Template(template) = node else {
            continue;
        };
        let index = *occurrence;
        *occurrence += 1;

        let mut seen: HashMap<String, usize> = HashMap::new();
        for param in &mut template.params {
            let slot = param.key().filter(|k| protected.contains(k)).map(|k| {
                let key = normalize_key(k);
                let nth = seen.entry(key.clone()).or_default();
                let slot = (index, key, *nth);
                *nth += 1;
                slot
            });

            match slot.and_then(|slot| originals.get(&slot)) {
                Some(value) => {
                    *occurrence += value.template_count();
                    if param.value != *value {
                        param.value = value.clone();
                        restored += 1;
                    }
                }
                None => restored += restore_in(&mut param.value, originals, protected, occurrence),
            }
        }
    }
    restored
}
