/// Estimates how many tokens a downstream model will see for a piece of text.
///
/// Over-estimating is the safe direction: it only produces smaller chunks.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Fixed character-to-token ratio, counted in Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRatioEstimator {
    pub chars_per_token: usize,
}

impl CharRatioEstimator {
    #[must_use]
    pub const fn new(chars_per_token: usize) -> Self {
        Self { chars_per_token }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count() / self.chars_per_token.max(1)
    }
}

impl<F> TokenEstimator for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate(&self, text: &str) -> usize {
        self(text)
    }
}
