//! # Wikitrans Chunker
//!
//! Section-aware chunking of wikitext for submission to a text
//! transformation service with a bounded input size.
//!
//! ## Algorithm
//!
//! ```text
//! Wikitext
//!     │
//!     ├──> Heading scan (== … == through ====== … ======) → sections
//!     │
//!     ├──> Greedy packing of whole sections while the estimate fits
//!     │
//!     └──> Oversized section
//!          ├─> Split body at blank lines, heading kept on the first piece
//!          ├─> Greedy packing of paragraphs
//!          └─> A paragraph over budget on its own is emitted unsplit
//! ```
//!
//! Token counts come from a [`TokenEstimator`]; the default counts one
//! token per three characters, which over-estimates for most models.
//!
//! ## Example
//!
//! ```rust
//! use wikitrans_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::try_new(ChunkerConfig::with_max_tokens(200)).unwrap();
//! let chunks = chunker.chunk_text("Lead.\n\n== History ==\nSome history.");
//! assert_eq!(chunks.len(), 1);
//! assert!(chunks[0].content.contains("== History =="));
//! ```

mod chunker;
mod config;
mod error;
mod estimator;
mod section;
mod types;

pub use chunker::{chunk_text, Chunker, ChunkingStats};
pub use config::{ChunkerConfig, DEFAULT_SEPARATOR};
pub use error::{ChunkerError, Result};
pub use estimator::{CharRatioEstimator, TokenEstimator};
pub use section::{split_sections, Section};
pub use types::{Chunk, ChunkKind};
