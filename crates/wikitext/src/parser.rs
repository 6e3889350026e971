//! Lenient wikitext parser.
//!
//! Recognises templates, internal links, comments, template arguments and
//! `<nowiki>` spans. Anything unterminated degrades to plain text, so
//! `parse(text)?.to_string() == text` holds for every accepted input. The
//! only rejection is template nesting beyond [`MAX_NESTING`].

use crate::ast::{Node, Parameter, Template, Wikicode};
use crate::error::{Result, WikitextError};
use std::collections::HashSet;

/// Deepest template nesting accepted before parsing fails
pub const MAX_NESTING: usize = 128;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const NOWIKI_OPEN: &str = "<nowiki>";
const NOWIKI_CLOSE: &str = "</nowiki>";

/// Parse wikitext into a node tree
pub fn parse(text: &str) -> Result<Wikicode> {
    let mut parser = Parser {
        src: text,
        pos: 0,
        depth: 0,
        rejected: HashSet::new(),
    };
    let (nodes, _) = parser.parse_nodes(false)?;
    Ok(Wikicode { nodes })
}

/// Why a node run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Eof,
    /// `|` inside a template, not consumed
    Pipe,
    /// `}}` inside a template, not consumed
    Close,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    /// Offsets of `{{` already known not to open a template
    rejected: HashSet<usize>,
}

impl Parser<'_> {
    fn parse_nodes(&mut self, in_template: bool) -> Result<(Vec<Node>, Stop)> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        let stop = loop {
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                break Stop::Eof;
            }
            if in_template {
                if rest.starts_with("}}") {
                    break Stop::Close;
                }
                if rest.starts_with('|') {
                    break Stop::Pipe;
                }
            }

            let raw = if rest.starts_with(COMMENT_OPEN) {
                delimited_len(rest, COMMENT_OPEN, COMMENT_CLOSE).map(Node::Comment)
            } else if rest.starts_with(NOWIKI_OPEN) {
                delimited_len(rest, NOWIKI_OPEN, NOWIKI_CLOSE).map(Node::Nowiki)
            } else if rest.starts_with("{{{") {
                argument_len(rest).map(|len| Node::Argument(rest[..len].to_string()))
            } else if rest.starts_with("[[") {
                link_len(rest).map(|len| Node::Link(rest[..len].to_string()))
            } else {
                None
            };

            if let Some(node) = raw {
                self.pos += node.to_string().len();
                flush_text(&mut text, &mut nodes);
                nodes.push(node);
                continue;
            }

            if rest.starts_with("{{") && !rest.starts_with("{{{") {
                if let Some(template) = self.try_template()? {
                    flush_text(&mut text, &mut nodes);
                    nodes.push(Node::Template(template));
                    continue;
                }
                text.push_str("{{");
                self.pos += 2;
                continue;
            }

            let len = plain_run_len(rest, in_template);
            text.push_str(&rest[..len]);
            self.pos += len;
        };

        flush_text(&mut text, &mut nodes);
        Ok((nodes, stop))
    }

    /// Parse a template at `self.pos`, restoring the position if it never closes
    fn try_template(&mut self) -> Result<Option<Template>> {
        let start = self.pos;
        if self.rejected.contains(&start) {
            return Ok(None);
        }
        if self.depth >= MAX_NESTING {
            return Err(WikitextError::too_deep(MAX_NESTING, start));
        }

        self.depth += 1;
        self.pos += 2;
        let parsed = self.template_body();
        self.depth -= 1;

        match parsed? {
            Some(template) => Ok(Some(template)),
            None => {
                self.rejected.insert(start);
                self.pos = start;
                Ok(None)
            }
        }
    }

    fn template_body(&mut self) -> Result<Option<Template>> {
        let (name_nodes, mut stop) = self.parse_nodes(true)?;
        let name = Wikicode { nodes: name_nodes }.to_string();
        if name.trim().is_empty() {
            return Ok(None);
        }

        let mut params = Vec::new();
        loop {
            match stop {
                Stop::Eof => return Ok(None),
                Stop::Close => {
                    self.pos += 2;
                    return Ok(Some(Template { name, params }));
                }
                Stop::Pipe => {
                    self.pos += 1;
                    let (nodes, next) = self.parse_nodes(true)?;
                    params.push(Parameter::from_nodes(nodes));
                    stop = next;
                }
            }
        }
    }
}

fn flush_text(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

/// Length of a plain text run: at least one char, up to the next markup byte
fn plain_run_len(rest: &str, in_template: bool) -> usize {
    let first = rest.chars().next().map_or(0, char::len_utf8);
    let specials: &[u8] = if in_template { b"{[<|}" } else { b"{[<" };
    rest.as_bytes()[first..]
        .iter()
        .position(|b| specials.contains(b))
        .map_or(rest.len(), |at| first + at)
}

/// Raw text of an `open … close` span, `None` when `close` never appears
fn delimited_len(rest: &str, open: &str, close: &str) -> Option<String> {
    rest[open.len()..]
        .find(close)
        .map(|at| rest[..open.len() + at + close.len()].to_string())
}

/// Length of a `{{{…}}}` argument with balanced braces
fn argument_len(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in rest.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let len = i + 1;
                    return rest[..len].ends_with("}}}").then_some(len);
                }
            }
            _ => {}
        }
    }
    None
}

/// Length of a `[[…]]` link with balanced brackets.
///
/// A blank line or a `}}` that closes an enclosing template ends the scan.
fn link_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut braces = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let pair = (bytes[i], bytes.get(i + 1).copied());
        match pair {
            (b'[', Some(b'[')) => {
                depth += 1;
                i += 2;
            }
            (b']', Some(b']')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Some(i);
                }
            }
            (b'{', Some(b'{')) => {
                braces += 1;
                i += 2;
            }
            (b'}', Some(b'}')) => {
                braces = braces.checked_sub(1)?;
                i += 2;
            }
            (b'\n', Some(b'\n')) => return None,
            _ => i += 1,
        }
    }
    None
}
