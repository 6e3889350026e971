use serde::{Deserialize, Serialize};

/// A size-bounded, order-preserving fragment of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text (sections or paragraphs joined by the separator)
    pub content: String,

    /// Estimated token count of `content`
    pub estimated_tokens: usize,

    /// Kind of unit the chunk was packed from
    pub kind: ChunkKind,
}

impl Chunk {
    #[must_use]
    pub const fn new(content: String, estimated_tokens: usize, kind: ChunkKind) -> Self {
        Self {
            content,
            estimated_tokens,
            kind,
        }
    }

    /// Whether this chunk was forced in despite exceeding the budget
    #[must_use]
    pub const fn is_oversized(&self) -> bool {
        matches!(self.kind, ChunkKind::Forced)
    }

    #[must_use]
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// How a chunk was assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// One or more whole sections
    Sections,
    /// Paragraphs of a section too large to pack whole
    Paragraphs,
    /// A single unit over budget, included unsplit
    Forced,
}

impl ChunkKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sections => "sections",
            Self::Paragraphs => "paragraphs",
            Self::Forced => "forced",
        }
    }
}
