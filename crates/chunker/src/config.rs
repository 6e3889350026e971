use serde::{Deserialize, Serialize};

/// Separator placed between sections or paragraphs packed into one chunk
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Configuration for section-aware chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum estimated tokens per chunk (hard limit, except forced paragraphs)
    pub max_tokens: usize,

    /// Characters counted as one token by the default estimator
    pub chars_per_token: usize,

    /// Text inserted between packed sections and paragraphs
    pub separator: String,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 7000,
            chars_per_token: 3,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ChunkerConfig {
    /// Config with the default estimator ratio and the given budget
    #[must_use]
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens == 0 {
            return Err("max_tokens must be > 0".to_string());
        }

        if self.chars_per_token == 0 {
            return Err("chars_per_token must be > 0".to_string());
        }

        // Headings only match at line start, so packed sections must stay on their own lines.
        if !self.separator.contains('\n') {
            return Err(format!(
                "separator {:?} must contain a line break",
                self.separator
            ));
        }

        Ok(())
    }
}
