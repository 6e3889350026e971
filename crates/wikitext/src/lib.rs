//! # Wikitrans Wikitext
//!
//! Structure-preserving helpers for sending wikitext through a transformation
//! that may rewrite any natural-language text it sees.
//!
//! ## Pipeline
//!
//! ```text
//! source ──> extract_subresource_refs ──> SubresourcePlaceholders::protect
//!        ──> mask_templates ──> (chunk, transform, join)
//!        ──> unmask ──> restore_protected_values
//!        ──> SubresourcePlaceholders::substitute ──> output
//! ```
//!
//! Every step that parses degrades instead of failing: masking passes the text
//! through, extraction returns nothing and restoration returns its input.
//!
//! ## Example
//!
//! ```rust
//! use wikitrans_wikitext::{mask_templates, restore_protected_values, unmask, ProtectedParams};
//!
//! let source = "{{Infobox|image=Cow.jpg|caption=A cow}}";
//! let masked = mask_templates(source);
//! assert!(!masked.text.contains("Infobox"));
//!
//! // A translation that rewrites every value
//! let translated = masked.text.replace("Cow.jpg", "Vache.jpg").replace("A cow", "Une vache");
//! let unmasked = unmask(&translated, &masked.mapping);
//! let out = restore_protected_values(source, &unmasked, &ProtectedParams::default());
//! assert_eq!(out, "{{Infobox|image=Cow.jpg|caption=Une vache}}");
//! ```

mod ast;
mod error;
mod interwiki;
mod mask;
mod namespace;
mod params;
mod parser;
mod placeholder;
mod restore;
mod subresource;
mod validate;

pub use ast::{Node, NodeKind, Parameter, Template, Wikicode};
pub use error::{Result, WikitextError};
pub use interwiki::{interwiki_links, interwiki_marker, upsert_interwiki_link};
pub use mask::{mask_templates, unmask, Masked};
pub use namespace::{split_namespace, translate_namespace_prefix};
pub use params::{normalize_key, ProtectedParams, DEFAULT_PROTECTED_KEYS};
pub use parser::{parse, MAX_NESTING};
pub use placeholder::{find_placeholders, PlaceholderAllocator, PlaceholderMap, PlaceholderRole};
pub use restore::restore_protected_values;
pub use subresource::{
    extract_refs_with_key, extract_subresource_refs, json_subpage_name, json_subpage_target,
    SubresourcePlaceholders, DEFAULT_SUBRESOURCE_KEY,
};
pub use validate::{count_braces, StructureReport};
