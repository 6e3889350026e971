//! Node model for parsed wikitext.
//!
//! Serializing a parsed document reproduces its source byte for byte, so
//! every transformation edits nodes and then writes them back out.

use std::fmt;

/// An ordered sequence of nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wikicode {
    pub nodes: Vec<Node>,
}

/// Coarse classification used to filter nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Template invocation with a name and parameters
    Structural,
    /// Internal link `[[…]]`
    Link,
    /// Plain text
    Text,
    /// Comments, template arguments, `<nowiki>` spans
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Template(Template),
    /// Raw `[[…]]` including brackets
    Link(String),
    /// Raw `<!-- … -->`
    Comment(String),
    /// Raw `{{{name|default}}}`
    Argument(String),
    /// Raw `<nowiki>…</nowiki>`
    Nowiki(String),
}

impl Node {
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Template(_) => NodeKind::Structural,
            Self::Link(_) => NodeKind::Link,
            Self::Text(_) => NodeKind::Text,
            Self::Comment(_) | Self::Argument(_) | Self::Nowiki(_) => NodeKind::Other,
        }
    }
}

/// `{{name|key=value|positional}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Raw name text, surrounding whitespace included
    pub name: String,
    pub params: Vec<Parameter>,
}

impl Template {
    /// Name without surrounding whitespace
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.trim()
    }

    /// First parameter whose trimmed key equals `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.key() == Some(key))
    }
}

/// One `|`-separated template parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Raw key text for named parameters, `None` for positional ones
    pub key: Option<String>,
    pub value: Wikicode,
}

impl Parameter {
    /// Split a parameter's nodes at the first `=` found in a text node
    pub(crate) fn from_nodes(mut nodes: Vec<Node>) -> Self {
        let split = nodes.iter().enumerate().find_map(|(i, node)| match node {
            Node::Text(text) => text.find('=').map(|at| (i, at)),
            _ => None,
        });

        let Some((index, at)) = split else {
            return Self {
                key: None,
                value: Wikicode { nodes },
            };
        };

        let mut value_nodes = nodes.split_off(index);
        let Node::Text(text) = value_nodes.remove(0) else {
            unreachable!("split index always points at a text node");
        };

        let mut key = Wikicode { nodes }.to_string();
        key.push_str(&text[..at]);

        let rest = &text[at + 1..];
        if !rest.is_empty() {
            value_nodes.insert(0, Node::Text(rest.to_string()));
        }

        Self {
            key: Some(key),
            value: Wikicode { nodes: value_nodes },
        }
    }

    /// Key without surrounding whitespace
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim)
    }

    #[must_use]
    pub const fn is_named(&self) -> bool {
        self.key.is_some()
    }
}

impl Wikicode {
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::Text(text.into())],
        }
    }

    /// Top-level nodes of one kind
    pub fn filter(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    /// All templates, nested ones included, in document order.
    ///
    /// A template comes before the templates nested in its parameters; the
    /// position in this list is the template's occurrence index.
    #[must_use]
    pub fn templates(&self) -> Vec<&Template> {
        let mut out = Vec::new();
        collect_templates(self, &mut out);
        out
    }

    #[must_use]
    pub fn template_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Template(t) => {
                    1 + t
                        .params
                        .iter()
                        .map(|p| p.value.template_count())
                        .sum::<usize>()
                }
                _ => 0,
            })
            .sum()
    }

    /// Visit every template mutably, in the same order as [`Self::templates`]
    pub fn for_each_template_mut<F: FnMut(&mut Template)>(&mut self, f: &mut F) {
        for node in &mut self.nodes {
            if let Node::Template(template) = node {
                f(template);
                for param in &mut template.params {
                    param.value.for_each_template_mut(f);
                }
            }
        }
    }
}

fn collect_templates<'a>(code: &'a Wikicode, out: &mut Vec<&'a Template>) {
    for node in &code.nodes {
        if let Node::Template(template) = node {
            out.push(template);
            for param in &template.params {
                collect_templates(&param.value, out);
            }
        }
    }
}

impl fmt::Display for Wikicode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.nodes.iter().try_for_each(|node| write!(f, "{node}"))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(raw)
            | Self::Link(raw)
            | Self::Comment(raw)
            | Self::Argument(raw)
            | Self::Nowiki(raw) => f.write_str(raw),
            Self::Template(template) => write!(f, "{template}"),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}", self.name)?;
        for param in &self.params {
            write!(f, "|{param}")?;
        }
        f.write_str("}}")
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            write!(f, "{key}=")?;
        }
        write!(f, "{}", self.value)
    }
}
