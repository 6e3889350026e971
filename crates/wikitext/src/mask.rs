//! Masking of template names and parameter keys.
//!
//! Parameter values stay readable so they can still be translated; only
//! the structural tokens are swapped for placeholders.

use crate::ast::Template;
use crate::parser::parse;
use crate::placeholder::{PlaceholderAllocator, PlaceholderMap, PlaceholderRole};

/// Result of a masking pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Masked {
    pub text: String,
    pub mapping: PlaceholderMap,
    /// `false` when the input could not be parsed and was passed through
    pub protected: bool,
}

/// Replace every template name and parameter key with a placeholder.
///
/// Whitespace around names and keys is kept outside the placeholder.
/// Unparseable input comes back unchanged with an empty mapping and
/// `protected == false`.
#[must_use]
pub fn mask_templates(text: &str) -> Masked {
    let mut code = match parse(text) {
        Ok(code) => code,
        Err(e) => {
            log::warn!("Masking skipped, wikitext left unprotected: {e}");
            return Masked {
                text: text.to_string(),
                mapping: PlaceholderMap::new(),
                protected: false,
            };
        }
    };

    let mut alloc = PlaceholderAllocator::for_source(text);
    let mut mapping = PlaceholderMap::new();
    code.for_each_template_mut(&mut |template: &mut Template| {
        if let Some(masked) = mask_core(&template.name, PlaceholderRole::TemplateName, &mut alloc, &mut mapping) {
            template.name = masked;
        }
        for param in &mut template.params {
            if let Some(key) = param.key.as_mut() {
                if let Some(masked) = mask_core(key, PlaceholderRole::ParamKey, &mut alloc, &mut mapping) {
                    *key = masked;
                }
            }
        }
    });

    Masked {
        text: code.to_string(),
        mapping,
        protected: true,
    }
}

/// Put back every masked name and key
#[must_use]
pub fn unmask(text: &str, mapping: &PlaceholderMap) -> String {
    mapping.restore(text)
}

fn mask_core(
    raw: &str,
    role: PlaceholderRole,
    alloc: &mut PlaceholderAllocator<'_>,
    mapping: &mut PlaceholderMap,
) -> Option<String> {
    let core = raw.trim();
    if core.is_empty() {
        return None;
    }
    let lead = raw.len() - raw.trim_start().len();
    let tail = lead + core.len();

    let placeholder = alloc.allocate(role);
    let masked = format!("{}{placeholder}{}", &raw[..lead], &raw[tail..]);
    mapping.insert(placeholder, core.to_string());
    Some(masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn masks_names_and_keys_but_not_values() {
        let masked = mask_templates("{{Infobox\n| image = Cow.jpg\n| caption = A cow\n}}");

        assert!(masked.protected);
        assert_eq!(
            masked.text,
            "{{⟪TPL_0⟫\n| ⟪KEY_1⟫ = Cow.jpg\n| ⟪KEY_2⟫ = A cow\n}}"
        );
        assert_eq!(masked.mapping.get("⟪TPL_0⟫"), Some("Infobox"));
        assert_eq!(masked.mapping.get("⟪KEY_2⟫"), Some("caption"));
    }

    #[test]
    fn positional_params_and_nested_templates() {
        let masked = mask_templates("{{Lang|fr|texte={{Nobr|mot}}}}");
        assert_eq!(masked.text, "{{⟪TPL_0⟫|fr|⟪KEY_1⟫={{⟪TPL_2⟫|mot}}}}");
        assert_eq!(masked.mapping.len(), 3);
    }

    #[test]
    fn non_template_content_passes_through() {
        let text = "Plain '''bold''' [[Link|text]] <!-- note -->";
        let masked = mask_templates(text);
        assert_eq!(masked.text, text);
        assert!(masked.mapping.is_empty());
        assert!(masked.protected);
    }

    #[test]
    fn each_occurrence_gets_its_own_placeholder() {
        let masked = mask_templates("{{A}} {{A}}");
        assert_eq!(masked.text, "{{⟪TPL_0⟫}} {{⟪TPL_1⟫}}");
    }

    #[test]
    fn unmask_round_trips() {
        let text = "{{Culture\n| Nom = Trèfle\n| Icone = Trèfle.png\n}}\nLe '''trèfle'''.";
        let masked = mask_templates(text);
        assert_eq!(unmask(&masked.text, &masked.mapping), text);
    }

    #[test]
    fn unparseable_input_is_passed_through() {
        let depth = crate::parser::MAX_NESTING + 1;
        let text = format!("{}x{}", "{{a|".repeat(depth), "}}".repeat(depth));
        let masked = mask_templates(&text);

        assert!(!masked.protected);
        assert_eq!(masked.text, text);
        assert!(masked.mapping.is_empty());
    }
}
