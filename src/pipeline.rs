//! Prompt-to-budget pipeline.
//!
//! A single linear pass: normalize, encode, count, truncate, count. Every
//! component is injected, so any stage can be replaced by a fake in tests.
//! The pipeline holds no mutable state and can serve concurrent callers.

use std::sync::Arc;

use serde::Serialize;

use crate::codec::{Codec, TiktokenCodec, TokenId, TokenSequence};
use crate::config::Config;
use crate::counter::{Counter, TokenCounter};
use crate::error::Result;
use crate::events::{CountStage, EventSink, PipelineEvent};
use crate::normalize::{Normalizer, WhitespaceNormalizer};
use crate::truncate::{TokenLimit, Truncation, Truncator};

/// Everything produced by one [`PromptPipeline::process`] call.
///
/// `truncated_tokens` is always a prefix of `tokens`, and
/// `count_after <= min(count_before, limit)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    #[serde(rename = "optimized_prompt")]
    pub normalized_prompt: String,
    /// Tokens before truncation.
    #[serde(rename = "encoded_tokens")]
    pub tokens: TokenSequence,
    #[serde(rename = "token_count_before")]
    pub count_before: usize,
    pub truncated_tokens: TokenSequence,
    #[serde(rename = "token_count_after")]
    pub count_after: usize,
}

impl ProcessingResult {
    pub fn was_truncated(&self) -> bool {
        self.count_after < self.count_before
    }

    /// Number of tokens cut from the tail.
    pub fn dropped(&self) -> usize {
        self.count_before - self.count_after
    }
}

/// Fits prompts into a token budget.
pub struct PromptPipeline {
    normalizer: Box<dyn Normalizer>,
    codec: Arc<dyn Codec>,
    counter: Box<dyn Counter>,
    truncator: Box<dyn Truncation>,
    sink: Arc<dyn EventSink>,
}

impl PromptPipeline {
    pub fn new(
        normalizer: Box<dyn Normalizer>,
        codec: Arc<dyn Codec>,
        counter: Box<dyn Counter>,
        truncator: Box<dyn Truncation>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            normalizer,
            codec,
            counter,
            truncator,
            sink,
        }
    }

    /// Build the default pipeline for `config`: whitespace normalization, a
    /// tiktoken codec for the configured model, and the configured limit.
    ///
    /// The limit is validated before the vocabulary is loaded, so a
    /// negative limit fails fast.
    pub fn from_config(config: &Config, sink: Arc<dyn EventSink>) -> Result<Self> {
        let limit = config.limit()?;
        let codec = TiktokenCodec::for_model(&config.model, sink.as_ref())?;
        Ok(Self::new(
            Box::new(WhitespaceNormalizer),
            Arc::new(codec),
            Box::new(TokenCounter),
            Box::new(Truncator::new(limit)),
            sink,
        ))
    }

    pub fn limit(&self) -> TokenLimit {
        self.truncator.limit()
    }

    pub fn vocabulary(&self) -> &str {
        self.codec.vocabulary()
    }

    /// Run `prompt` through the pipeline. Fails as a whole if encoding
    /// fails; no partial result is returned.
    pub fn process(&self, prompt: &str) -> Result<ProcessingResult> {
        let normalized = self.normalizer.normalize(prompt);
        self.sink.emit(&PipelineEvent::Normalized {
            prompt: &normalized,
        });

        let tokens = self.codec.encode(&normalized)?;
        self.sink.emit(&PipelineEvent::Encoded { tokens: &tokens });

        let count_before = self.counter.count(&tokens);
        self.sink.emit(&PipelineEvent::Counted {
            stage: CountStage::BeforeTruncation,
            count: count_before,
        });

        let truncated = self.truncator.truncate(&tokens);
        let count_after = self.counter.count(&truncated);
        if count_after < count_before {
            self.sink.emit(&PipelineEvent::Truncated {
                limit: self.limit().get(),
                dropped: count_before - count_after,
            });
        }
        self.sink.emit(&PipelineEvent::Counted {
            stage: CountStage::AfterTruncation,
            count: count_after,
        });

        Ok(ProcessingResult {
            normalized_prompt: normalized,
            tokens,
            count_before,
            truncated_tokens: truncated,
            count_after,
        })
    }

    /// Decode tokens with this pipeline's codec, e.g. to recover the
    /// truncated prompt text.
    pub fn decode(&self, tokens: &[TokenId]) -> Result<String> {
        self.codec.decode(tokens)
    }
}

impl std::fmt::Debug for PromptPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptPipeline")
            .field("vocabulary", &self.codec.vocabulary())
            .field("limit", &self.truncator.limit())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
