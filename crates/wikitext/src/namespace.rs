//! Namespace prefixes that differ between language editions.

/// French namespace prefix → English equivalent
const FR_TO_EN: &[(&str, &str)] = &[
    ("Catégorie", "Category"),
    ("Fichier", "File"),
    ("Modèle", "Template"),
    ("Portail", "Portal"),
    ("Projet", "Project"),
    ("Aide", "Help"),
    ("Discussion", "Talk"),
];

/// Rewrite a known namespace prefix of `title` for the target edition.
///
/// Only the prefix changes; the page name is left for the caller. Titles
/// without a known prefix, or language pairs without a table, are returned
/// as-is.
#[must_use]
pub fn translate_namespace_prefix(title: &str, source_lang: &str, target_lang: &str) -> String {
    if let Some((prefix, rest)) = split_namespace(title, source_lang, target_lang) {
        return format!("{prefix}:{rest}");
    }
    title.to_string()
}

/// The target prefix and the remaining page name when `title` carries a
/// mapped namespace
#[must_use]
pub fn split_namespace<'a>(
    title: &'a str,
    source_lang: &str,
    target_lang: &str,
) -> Option<(&'static str, &'a str)> {
    if source_lang != "fr" || target_lang != "en" {
        return None;
    }
    let (prefix, rest) = title.split_once(':')?;
    FR_TO_EN
        .iter()
        .find(|(fr, _)| *fr == prefix)
        .map(|(_, en)| (*en, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_french_prefixes_to_english() {
        assert_eq!(translate_namespace_prefix("Catégorie:Blé", "fr", "en"), "Category:Blé");
        assert_eq!(translate_namespace_prefix("Fichier:Image.jpg", "fr", "en"), "File:Image.jpg");
        assert_eq!(translate_namespace_prefix("Modèle:Infobox", "fr", "en"), "Template:Infobox");
    }

    #[test]
    fn unknown_prefix_or_plain_title_is_unchanged() {
        assert_eq!(translate_namespace_prefix("Category:Wheat", "fr", "en"), "Category:Wheat");
        assert_eq!(translate_namespace_prefix("Blé", "fr", "en"), "Blé");
        assert_eq!(translate_namespace_prefix("Blé: culture", "fr", "en"), "Blé: culture");
    }

    #[test]
    fn other_language_pairs_are_unchanged() {
        assert_eq!(translate_namespace_prefix("Catégorie:Blé", "fr", "de"), "Catégorie:Blé");
        assert_eq!(split_namespace("Catégorie:Blé", "en", "fr"), None);
        assert_eq!(split_namespace("Aide:Index", "fr", "en"), Some(("Help", "Index")));
    }
}
