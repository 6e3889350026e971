use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::estimator::{CharRatioEstimator, TokenEstimator};
use crate::section::{split_sections, Section};
use crate::types::{Chunk, ChunkKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\r?\n[ \t]*\r?\n").unwrap_or_else(|e| panic!("invalid paragraph pattern: {e}"))
});

/// Main chunker interface for splitting wikitext into token-bounded pieces
pub struct Chunker {
    config: ChunkerConfig,
    estimator: Box<dyn TokenEstimator>,
}

impl Chunker {
    /// Create a chunker using the character-ratio estimator from `config`
    pub fn try_new(config: ChunkerConfig) -> Result<Self> {
        let estimator = CharRatioEstimator::new(config.chars_per_token);
        Self::with_estimator(config, estimator)
    }

    /// Create a chunker with a custom token estimator
    pub fn with_estimator(
        config: ChunkerConfig,
        estimator: impl TokenEstimator + 'static,
    ) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self {
            config,
            estimator: Box::new(estimator),
        })
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Estimated token count of `text` under this chunker's estimator
    #[must_use]
    pub fn estimate(&self, text: &str) -> usize {
        self.estimator.estimate(text)
    }

    /// Split `text` into ordered chunks along section boundaries.
    ///
    /// Sections are packed greedily. A section over budget is re-split into
    /// blank-line paragraphs, its heading kept as prefix of the first piece.
    /// A paragraph over budget on its own becomes a single forced chunk.
    /// Blank input yields one chunk holding the input unchanged.
    #[must_use]
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return vec![Chunk::new(
                text.to_string(),
                self.estimate(text),
                ChunkKind::Sections,
            )];
        }

        let mut packer = Packer::new(self);
        for section in split_sections(text) {
            let section_text = section.text();
            if self.estimate(&section_text) > self.config.max_tokens {
                packer.flush();
                self.pack_paragraphs(&section, &mut packer);
                packer.flush();
            } else {
                packer.push(&section_text, ChunkKind::Sections);
            }
        }
        packer.finish()
    }

    fn pack_paragraphs(&self, section: &Section, packer: &mut Packer<'_>) {
        let mut heading = (!section.heading.is_empty()).then_some(section.heading.as_str());
        log::debug!(
            "Section {:?} exceeds {} tokens, splitting by paragraph",
            section.title,
            self.config.max_tokens
        );

        for paragraph in split_paragraphs(&section.body) {
            let unit: Cow<'_, str> = match heading.take() {
                Some(h) => Cow::Owned(format!("{h}\n{paragraph}")),
                None => Cow::Borrowed(paragraph),
            };

            if packer.append(&unit, ChunkKind::Paragraphs) {
                continue;
            }
            packer.flush();
            if packer.append(&unit, ChunkKind::Paragraphs) {
                continue;
            }

            // Heading plus paragraph is over budget while the paragraph alone
            // fits: the heading goes out alone rather than forcing both.
            if matches!(unit, Cow::Owned(_)) && self.estimate(paragraph) <= self.config.max_tokens {
                packer.push(&section.heading, ChunkKind::Paragraphs);
                packer.flush();
                packer.push(paragraph, ChunkKind::Paragraphs);
                continue;
            }

            packer.force(&unit);
        }

        if let Some(h) = heading {
            packer.push(h, ChunkKind::Paragraphs);
        }
    }

    /// Join transformed chunk texts back together in chunk order
    #[must_use]
    pub fn reassemble<S: AsRef<str>>(&self, parts: &[S]) -> String {
        parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(&self.config.separator)
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn get_stats(chunks: &[Chunk]) -> ChunkingStats {
        let tokens = chunks.iter().map(|c| c.estimated_tokens);
        let total_tokens: usize = tokens.clone().sum();
        ChunkingStats {
            total_chunks: chunks.len(),
            total_chars: chunks.iter().map(Chunk::char_count).sum(),
            total_tokens,
            avg_tokens_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_tokens / chunks.len()
            },
            min_tokens: tokens.clone().min().unwrap_or(0),
            max_tokens: tokens.max().unwrap_or(0),
            oversized_chunks: chunks.iter().filter(|c| c.is_oversized()).count(),
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        let config = ChunkerConfig::default();
        Self {
            estimator: Box::new(CharRatioEstimator::new(config.chars_per_token)),
            config,
        }
    }
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Chunk `text` with the default estimator and the given budget.
#[must_use]
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    let chunker = Chunker::try_new(ChunkerConfig::with_max_tokens(max_tokens.max(1)))
        .unwrap_or_default();
    chunker
        .chunk_text(text)
        .into_iter()
        .map(|c| c.content)
        .collect()
}

fn split_paragraphs(body: &str) -> impl Iterator<Item = &str> {
    BLANK_LINE
        .split(body)
        .map(|p| p.trim_matches(|c| c == '\n' || c == '\r'))
        .filter(|p| !p.trim().is_empty())
}

/// Greedy accumulator for the chunk under construction
struct Packer<'a> {
    chunker: &'a Chunker,
    out: Vec<Chunk>,
    buf: String,
    units: usize,
    kind: ChunkKind,
}

impl<'a> Packer<'a> {
    fn new(chunker: &'a Chunker) -> Self {
        Self {
            chunker,
            out: Vec::new(),
            buf: String::new(),
            units: 0,
            kind: ChunkKind::Sections,
        }
    }

    /// Append `unit` to the open chunk if the joined text stays within budget
    fn append(&mut self, unit: &str, kind: ChunkKind) -> bool {
        if self.units > 0 && self.kind != kind {
            return false;
        }

        let rollback = self.buf.len();
        if self.units > 0 {
            self.buf.push_str(&self.chunker.config.separator);
        }
        self.buf.push_str(unit);

        if self.chunker.estimate(&self.buf) <= self.chunker.config.max_tokens {
            self.units += 1;
            self.kind = kind;
            true
        } else {
            self.buf.truncate(rollback);
            false
        }
    }

    /// Append, closing the open chunk first if needed, forcing as a last resort
    fn push(&mut self, unit: &str, kind: ChunkKind) {
        if self.append(unit, kind) {
            return;
        }
        self.flush();
        if !self.append(unit, kind) {
            self.force(unit);
        }
    }

    fn force(&mut self, unit: &str) {
        self.flush();
        let tokens = self.chunker.estimate(unit);
        log::debug!(
            "Unit of ~{tokens} tokens exceeds budget of {}, emitting it unsplit",
            self.chunker.config.max_tokens
        );
        self.out
            .push(Chunk::new(unit.to_string(), tokens, ChunkKind::Forced));
    }

    fn flush(&mut self) {
        if self.units == 0 {
            return;
        }
        let content = std::mem::take(&mut self.buf);
        let tokens = self.chunker.estimate(&content);
        self.out.push(Chunk::new(content, tokens, self.kind));
        self.units = 0;
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        self.out
    }
}


/// Statistics about chunking results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub oversized_chunks: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Chars: {} | Tokens: {} | Avg: {} | Range: {}-{} | Oversized: {}",
            self.total_chunks,
            self.total_chars,
            self.total_tokens,
            self.avg_tokens_per_chunk,
            self.min_tokens,
            self.max_tokens,
            self.oversized_chunks
        )
    }
}
