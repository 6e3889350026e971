use pretty_assertions::assert_eq;
use std::collections::HashMap;
use wikitrans_wikitext::{
    extract_subresource_refs, mask_templates, restore_protected_values, unmask, ProtectedParams,
    StructureReport, SubresourcePlaceholders,
};

/// Stand-in for the translation service: rewrites known French words and
/// leaves everything else alone.
fn translate(text: &str) -> String {
    [("Vache", "Cow"), ("Une vache", "A cow"), ("Le blé", "Wheat"), ("rendement", "yield")]
        .iter()
        .fold(text.to_string(), |acc, (fr, en)| acc.replace(fr, en))
}

#[test]
fn protected_value_survives_translation() {
    let original = "{{Infobox|image=Cow.jpg|caption=A cow}}";
    let transformed = "{{Infobox|image=Vache.jpg|caption=Une vache}}";

    let registry = ProtectedParams::none().with_key("image");
    assert_eq!(
        restore_protected_values(original, transformed, &registry),
        "{{Infobox|image=Cow.jpg|caption=Une vache}}"
    );
}

#[test]
fn subresource_reference_is_substituted_after_transformation() {
    let source = "{{Graphique|json=Main/Data.json|titre=Le blé}}\nLe blé et son rendement.";

    let refs = extract_subresource_refs(source);
    assert_eq!(refs, vec!["Main/Data.json"]);

    let placeholders = SubresourcePlaceholders::for_document(source, &refs);
    let protected = placeholders.protect(source);
    assert!(!protected.contains("Main/Data.json"));

    let masked = mask_templates(&protected);
    let translated = translate(&masked.text);
    let unmasked = unmask(&translated, &masked.mapping);
    let restored = restore_protected_values(source, &unmasked, &ProtectedParams::default());

    let targets = HashMap::from([("Main/Data.json".to_string(), "Main/Data_en.json".to_string())]);
    let output = placeholders.substitute(&restored, &targets);

    assert_eq!(
        output,
        "{{Graphique|json=Main/Data_en.json|titre=Wheat}}\nWheat et son yield."
    );
    assert!(StructureReport::compare(source, &output).is_clean());
}

#[test]
fn masked_names_are_not_translated() {
    let source = "{{Vache|rendement=Vache}}";
    let masked = mask_templates(source);
    let translated = translate(&masked.text);
    assert_eq!(unmask(&translated, &masked.mapping), "{{Vache|rendement=Cow}}");
}
