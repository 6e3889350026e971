//! Heading-boundary scan over serialized wikitext.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// No backreferences in `regex`: both runs are captured and the shorter one
// sets the level. Surplus `=` on the longer side belongs to the title, so
// `== A ===` is a level-2 heading titled `A =`.
static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(={2,6})[ \t]*(.+?)[ \t]*(={2,6})[ \t]*\r?$")
        .unwrap_or_else(|e| panic!("invalid heading pattern: {e}"))
});

/// A heading line and the body text up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Full heading line including `=` markers, empty for the lead section
    pub heading: String,
    /// Heading level (2-6), `None` for the lead section
    pub level: Option<u8>,
    /// Heading title without markers
    pub title: String,
    /// Trimmed body text
    pub body: String,
}

impl Section {
    fn lead(body: &str) -> Self {
        Self {
            heading: String::new(),
            level: None,
            title: String::new(),
            body: body.trim().to_string(),
        }
    }

    #[must_use]
    pub fn is_lead(&self) -> bool {
        self.heading.is_empty()
    }

    /// Heading and body as they are packed into a chunk
    #[must_use]
    pub fn text(&self) -> String {
        match (self.heading.is_empty(), self.body.is_empty()) {
            (true, _) => self.body.clone(),
            (false, true) => self.heading.clone(),
            (false, false) => format!("{}\n{}", self.heading, self.body),
        }
    }
}

/// Split `text` into sections at `==`-style headings of level 2 to 6.
///
/// Content before the first heading becomes a lead section when it is not
/// blank. A text without headings yields exactly one lead section, so the
/// result is never empty.
#[must_use]
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;
    let mut last_end = 0;

    for caps in HEADING.captures_iter(text) {
        let (Some(whole), Some(open), Some(title), Some(close)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };

        let body = &text[last_end..whole.start()];
        match current.take() {
            Some(mut section) => {
                section.body = body.trim().to_string();
                sections.push(section);
            }
            None if !body.trim().is_empty() => sections.push(Section::lead(body)),
            None => {}
        }

        let level = open.len().min(close.len());
        let title = if open.len() == close.len() {
            title.as_str().trim()
        } else {
            text[open.start() + level..close.end() - level].trim()
        };
        current = Some(Section {
            heading: whole.as_str().trim_end_matches('\r').to_string(),
            level: u8::try_from(level).ok(),
            title: title.to_string(),
            body: String::new(),
        });
        last_end = whole.end();
    }

    let tail = &text[last_end..];
    match current {
        Some(mut section) => {
            section.body = tail.trim().to_string();
            sections.push(section);
        }
        None => sections.push(Section::lead(tail)),
    }

    sections
}
