use crate::codec::TokenId;

/// Measures a token sequence in the unit of budget accounting.
pub trait Counter: Send + Sync {
    fn count(&self, tokens: &[TokenId]) -> usize;
}

/// Counts one unit per token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl Counter for TokenCounter {
    fn count(&self, tokens: &[TokenId]) -> usize {
        tokens.len()
    }
}
