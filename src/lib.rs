//! Prepare prompts for a language model under a hard token budget.
//!
//! [`pipeline::PromptPipeline`] normalizes a prompt, encodes it with a
//! [`codec::Codec`], counts the tokens, truncates them to a
//! [`truncate::TokenLimit`] keeping the earliest tokens, and counts again.

pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod counter;
pub mod error;
pub mod events;
pub mod normalize;
pub mod pipeline;
pub mod truncate;

pub use codec::{Codec, TiktokenCodec, TokenId, TokenSequence, Vocabulary};
pub use error::{PromptBudgetError, Result};
pub use pipeline::{ProcessingResult, PromptPipeline};
