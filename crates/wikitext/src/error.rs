use thiserror::Error;

/// Result type for wikitext operations
pub type Result<T> = std::result::Result<T, WikitextError>;

/// Errors that can occur while interpreting wikitext
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WikitextError {
    /// Template nesting deeper than the parser accepts
    #[error("Parse error: template nesting exceeds {limit} levels at byte {offset}")]
    TooDeep { limit: usize, offset: usize },
}

impl WikitextError {
    /// Create a nesting-depth error
    pub const fn too_deep(limit: usize, offset: usize) -> Self {
        Self::TooDeep { limit, offset }
    }
}
