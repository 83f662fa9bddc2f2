//! Token counting used when a server omits usage accounting

/// Counts tokens in response text for a given model.
///
/// Implementations must be deterministic: the same text and model always
/// produce the same count.
pub trait TokenCounter: Send + Sync {
    /// Count the tokens in `text` as `model` would
    fn count(&self, text: &str, model: &str) -> usize;
}

/// Rough estimate of one token per three characters.
///
/// Used when no real encoding is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimateCounter;

impl TokenCounter for CharEstimateCounter {
    fn count(&self, text: &str, _model: &str) -> usize {
        text.chars().count() / 3
    }
}
