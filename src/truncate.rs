//! Prefix-preserving truncation of token sequences.
//!
//! The earliest tokens are always kept and the tail is dropped. There is no
//! suffix or middle mode.

use std::fmt;

use crate::codec::{TokenId, TokenSequence};
use crate::error::{PromptBudgetError, Result};

/// Default budget when none is configured.
pub const DEFAULT_TOKEN_LIMIT: usize = 4096;

/// Maximum number of tokens a sequence may keep. Zero is valid and
/// truncates everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenLimit(usize);

impl TokenLimit {
    pub const fn new(limit: usize) -> Self {
        Self(limit)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for TokenLimit {
    fn default() -> Self {
        Self(DEFAULT_TOKEN_LIMIT)
    }
}

impl TryFrom<i64> for TokenLimit {
    type Error = PromptBudgetError;

    fn try_from(value: i64) -> Result<Self> {
        if value < 0 {
            return Err(PromptBudgetError::invalid_configuration(
                "token_limit",
                format!("must be zero or greater, got {value}"),
            ));
        }
        usize::try_from(value).map(Self).map_err(|_| {
            PromptBudgetError::invalid_configuration(
                "token_limit",
                format!("{value} exceeds the platform maximum of {}", usize::MAX),
            )
        })
    }
}

impl fmt::Display for TokenLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Bounds a token sequence to a budget. The result must be a prefix of
/// the input no longer than [`Truncation::limit`].
pub trait Truncation: Send + Sync {
    fn limit(&self) -> TokenLimit;

    fn truncate(&self, tokens: &[TokenId]) -> TokenSequence;
}

/// Keeps the first [`TokenLimit`] tokens and drops the tail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Truncator {
    limit: TokenLimit,
}

impl Truncator {
    pub fn new(limit: TokenLimit) -> Self {
        Self { limit }
    }
}

impl Truncation for Truncator {
    fn limit(&self) -> TokenLimit {
        self.limit
    }

    fn truncate(&self, tokens: &[TokenId]) -> TokenSequence {
        truncate(tokens, self.limit.get())
    }
}

/// Return the first `limit` tokens, or all of them if there are fewer.
pub fn truncate(tokens: &[TokenId], limit: usize) -> TokenSequence {
    tokens[..tokens.len().min(limit)].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_than_limit_is_unchanged() {
        let tokens = vec![1, 2, 3];
        assert_eq!(truncate(&tokens, 3), tokens);
        assert_eq!(truncate(&tokens, 100), tokens);
    }

    #[test]
    fn keeps_prefix_when_over_limit() {
        let tokens: Vec<TokenId> = (0..10).collect();
        assert_eq!(truncate(&tokens, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn zero_limit_yields_empty() {
        assert!(truncate(&[5, 6, 7], 0).is_empty());
        assert!(Truncator::new(TokenLimit::new(0)).truncate(&[1]).is_empty());
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(truncate(&[], 10).is_empty());
        assert!(truncate(&[], 0).is_empty());
    }

    #[test]
    fn length_is_min_of_len_and_limit() {
        let tokens: Vec<TokenId> = (0..37).collect();
        for limit in [0, 1, 5, 36, 37, 38, 1000] {
            let out = truncate(&tokens, limit);
            assert_eq!(out.len(), tokens.len().min(limit));
            assert!(tokens.starts_with(&out));
        }
    }

    #[test]
    fn limit_rejects_negative() {
        let err = TokenLimit::try_from(-1).unwrap_err();
        assert!(err.is_user_error());
        assert!(err.to_string().contains("token_limit"));
    }

    #[test]
    fn negative_limit_message_names_the_sign() {
        let err = TokenLimit::try_from(i64::MIN).unwrap_err();
        assert!(err.to_string().contains("must be zero or greater"));
    }

    #[test]
    fn truncator_reports_its_limit() {
        let truncator = Truncator::new(TokenLimit::new(2));
        assert_eq!(truncator.limit().get(), 2);
        assert_eq!(truncator.truncate(&[9, 8, 7]), vec![9, 8]);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn oversized_limit_is_not_reported_as_negative() {
        let err = TokenLimit::try_from(i64::MAX).unwrap_err();
        assert!(err.is_user_error());
        assert!(err.to_string().contains("exceeds"));
        assert!(!err.to_string().contains("zero or greater"));
    }

    #[test]
    fn limit_accepts_zero_and_positive() {
        assert_eq!(TokenLimit::try_from(0).unwrap().get(), 0);
        assert_eq!(TokenLimit::try_from(4096).unwrap(), TokenLimit::default());
    }
}
