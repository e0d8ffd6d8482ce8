//! Token codec: maps prompt text to token ids and back.
//!
//! The [`Codec`] trait is the seam the pipeline depends on. The production
//! implementation, [`TiktokenCodec`], wraps the BPE vocabularies bundled
//! with `tiktoken-rs`. Construction is a two-step contract: resolve the
//! model to a [`Vocabulary`], and on [`VocabularyNotFound`] substitute
//! [`DEFAULT_VOCABULARY`] while reporting a warning event.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tiktoken_rs::tokenizer::{get_tokenizer, Tokenizer};
use tiktoken_rs::CoreBPE;

use crate::error::{PromptBudgetError, Result};
use crate::events::{EventSink, PipelineEvent};

/// A single token identifier from a vocabulary.
pub type TokenId = u32;

/// Ordered token ids; order follows the text left to right.
pub type TokenSequence = Vec<TokenId>;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Vocabulary used when the requested model is unknown.
pub const DEFAULT_VOCABULARY: Vocabulary = Vocabulary::Cl100kBase;

// ---------------------------------------------------------------------------
// Trait (extensibility point)
// ---------------------------------------------------------------------------

/// Converts text to token sequences and back for one fixed vocabulary.
///
/// Encoding must be deterministic. Implementations are shared read-only
/// across threads, so they must be `Send + Sync`.
pub trait Codec: Send + Sync {
    /// Encode `text`. The empty string encodes to an empty sequence.
    fn encode(&self, text: &str) -> Result<TokenSequence>;

    /// Decode `tokens` back into text. A sequence cut inside a multi-byte
    /// character decodes to the text before that character.
    fn decode(&self, tokens: &[TokenId]) -> Result<String>;

    /// Stable identifier of the vocabulary in use (e.g. `cl100k_base`).
    fn vocabulary(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

/// BPE vocabularies bundled with `tiktoken-rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    /// GPT-4o family.
    O200kBase,
    /// GPT-4 and GPT-3.5 Turbo.
    Cl100kBase,
    /// Codex and text-davinci-002/003.
    P50kBase,
    /// Edit models.
    P50kEdit,
    /// GPT-3 and GPT-2.
    R50kBase,
}

/// Primary lookup found no vocabulary for the model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no vocabulary registered for model '{model}'")]
pub struct VocabularyNotFound {
    pub model: String,
}

impl Vocabulary {
    /// Resolve a model name (or a bare vocabulary name) to its vocabulary.
    pub fn for_model(model: &str) -> std::result::Result<Self, VocabularyNotFound> {
        if let Ok(vocabulary) = model.parse() {
            return Ok(vocabulary);
        }
        match get_tokenizer(model) {
            Some(Tokenizer::O200kBase) => Ok(Self::O200kBase),
            Some(Tokenizer::Cl100kBase) => Ok(Self::Cl100kBase),
            Some(Tokenizer::P50kBase) => Ok(Self::P50kBase),
            Some(Tokenizer::P50kEdit) => Ok(Self::P50kEdit),
            Some(Tokenizer::R50kBase) | Some(Tokenizer::Gpt2) => Ok(Self::R50kBase),
            None => Err(VocabularyNotFound {
                model: model.to_string(),
            }),
        }
    }

    /// Identifier used in events and output.
    pub fn name(self) -> &'static str {
        match self {
            Self::O200kBase => "o200k_base",
            Self::Cl100kBase => "cl100k_base",
            Self::P50kBase => "p50k_base",
            Self::P50kEdit => "p50k_edit",
            Self::R50kBase => "r50k_base",
        }
    }

    /// Build the BPE tables for this vocabulary.
    fn load(self) -> Result<CoreBPE> {
        let loaded = match self {
            Self::O200kBase => tiktoken_rs::o200k_base(),
            Self::Cl100kBase => tiktoken_rs::cl100k_base(),
            Self::P50kBase => tiktoken_rs::p50k_base(),
            Self::P50kEdit => tiktoken_rs::p50k_edit(),
            Self::R50kBase => tiktoken_rs::r50k_base(),
        };
        loaded.map_err(|e| PromptBudgetError::codec_unavailable(self.name(), e.to_string()))
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Vocabulary {
    type Err = VocabularyNotFound;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "o200k_base" => Ok(Self::O200kBase),
            "cl100k_base" => Ok(Self::Cl100kBase),
            "p50k_base" => Ok(Self::P50kBase),
            "p50k_edit" => Ok(Self::P50kEdit),
            "r50k_base" | "gpt2" => Ok(Self::R50kBase),
            _ => Err(VocabularyNotFound {
                model: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// tiktoken-backed codec
// ---------------------------------------------------------------------------

/// [`Codec`] backed by a `tiktoken-rs` BPE vocabulary.
///
/// Vocabulary tables are built once here and are read-only afterwards;
/// wrap the codec in an `Arc` to share it between pipelines or threads.
pub struct TiktokenCodec {
    model: String,
    vocabulary: Vocabulary,
    fell_back: bool,
    bpe: CoreBPE,
}

impl TiktokenCodec {
    /// Build the codec for `model`, falling back to [`DEFAULT_VOCABULARY`]
    /// when the model is unknown. The fallback is reported to `sink` as a
    /// warning and is not an error.
    ///
    /// Fails only if the selected vocabulary's bundled tables cannot be
    /// built.
    pub fn for_model(model: &str, sink: &dyn EventSink) -> Result<Self> {
        let (vocabulary, fell_back) = match Vocabulary::for_model(model) {
            Ok(vocabulary) => (vocabulary, false),
            Err(VocabularyNotFound { .. }) => (DEFAULT_VOCABULARY, true),
        };
        let codec = Self::with_vocabulary(model, vocabulary, fell_back)?;

        let event = if fell_back {
            PipelineEvent::CodecFallback {
                model,
                vocabulary: vocabulary.name(),
            }
        } else {
            PipelineEvent::CodecReady {
                model,
                vocabulary: vocabulary.name(),
            }
        };
        sink.emit(&event);
        Ok(codec)
    }

    /// Build the codec for an explicit vocabulary, skipping model lookup.
    pub fn from_vocabulary(vocabulary: Vocabulary) -> Result<Self> {
        Self::with_vocabulary(vocabulary.name(), vocabulary, false)
    }

    fn with_vocabulary(model: &str, vocabulary: Vocabulary, fell_back: bool) -> Result<Self> {
        Ok(Self {
            model: model.to_string(),
            vocabulary,
            fell_back,
            bpe: vocabulary.load()?,
        })
    }

    /// The model name this codec was requested for.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The resolved vocabulary.
    pub fn kind(&self) -> Vocabulary {
        self.vocabulary
    }

    /// True if the requested model was unknown and the default was used.
    pub fn fell_back(&self) -> bool {
        self.fell_back
    }
}

impl fmt::Debug for TiktokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenCodec")
            .field("model", &self.model)
            .field("vocabulary", &self.vocabulary)
            .field("fell_back", &self.fell_back)
            .finish_non_exhaustive()
    }
}

impl Codec for TiktokenCodec {
    fn encode(&self, text: &str) -> Result<TokenSequence> {
        // User text is never allowed to produce special tokens.
        Ok(self.bpe.encode_ordinary(text))
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String> {
        Ok(utf8_prefix(
            self.bpe
                ._decode_native_and_split(tokens.to_vec())
                .flatten()
                .collect(),
        ))
    }

    fn vocabulary(&self) -> &str {
        self.vocabulary.name()
    }
}

/// Turn decoded token bytes into text.
///
/// A token prefix can end partway through a multi-byte character; that
/// trailing fragment is dropped. Invalid bytes anywhere else become U+FFFD.
fn utf8_prefix(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let utf8 = e.utf8_error();
            let mut bytes = e.into_bytes();
            if utf8.error_len().is_none() {
                bytes.truncate(utf8.valid_up_to());
            }
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use tracing::Level;

    #[test]
    fn known_models_resolve() {
        assert_eq!(Vocabulary::for_model("gpt-3.5-turbo"), Ok(Vocabulary::Cl100kBase));
        assert_eq!(Vocabulary::for_model("gpt-4"), Ok(Vocabulary::Cl100kBase));
        assert_eq!(Vocabulary::for_model("gpt-4o"), Ok(Vocabulary::O200kBase));
        assert_eq!(Vocabulary::for_model("text-davinci-003"), Ok(Vocabulary::P50kBase));
    }

    #[test]
    fn vocabulary_names_resolve_directly() {
        assert_eq!(Vocabulary::for_model("p50k_base"), Ok(Vocabulary::P50kBase));
        assert_eq!(Vocabulary::for_model("o200k_base"), Ok(Vocabulary::O200kBase));
        assert_eq!("cl100k_base".parse::<Vocabulary>(), Ok(Vocabulary::Cl100kBase));
    }

    #[test]
    fn unknown_model_is_typed_not_found() {
        let err = Vocabulary::for_model("llama-70b").unwrap_err();
        assert_eq!(err.model, "llama-70b");
        assert_eq!(
            err.to_string(),
            "no vocabulary registered for model 'llama-70b'"
        );
    }

    #[test]
    fn known_model_logs_info() {
        let sink = MemorySink::new();
        let codec = TiktokenCodec::for_model("gpt-3.5-turbo", &sink).unwrap();
        assert_eq!(codec.vocabulary(), "cl100k_base");
        assert!(!codec.fell_back());
        assert!(sink.at_level(Level::WARN).is_empty());
        assert_eq!(sink.at_level(Level::INFO).len(), 1);
    }

    #[test]
    fn unknown_model_falls_back_with_warning() {
        let sink = MemorySink::new();
        let codec = TiktokenCodec::for_model("not-a-real-model", &sink).unwrap();
        assert_eq!(codec.vocabulary(), DEFAULT_VOCABULARY.name());
        assert_eq!(codec.model(), "not-a-real-model");
        assert!(codec.fell_back());

        let warnings = sink.at_level(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("not-a-real-model"));
        assert!(warnings[0].message.contains("cl100k_base"));
    }

    #[test]
    fn empty_string_encodes_to_nothing() {
        let codec = TiktokenCodec::from_vocabulary(Vocabulary::Cl100kBase).unwrap();
        assert!(codec.encode("").unwrap().is_empty());
        assert_eq!(codec.decode(&[]).unwrap(), "");
    }

    #[test]
    fn known_encoding_cl100k() {
        let codec = TiktokenCodec::from_vocabulary(Vocabulary::Cl100kBase).unwrap();
        assert_eq!(codec.encode("hello world").unwrap(), vec![15339, 1917]);
    }

    #[test]
    fn encoding_is_deterministic() {
        let codec = TiktokenCodec::from_vocabulary(Vocabulary::O200kBase).unwrap();
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(codec.encode(text).unwrap(), codec.encode(text).unwrap());
    }

    #[test]
    fn decode_inverts_encode() {
        let codec = TiktokenCodec::from_vocabulary(Vocabulary::Cl100kBase).unwrap();
        for text in ["hello world", "  spaced  out ", "naïve café 日本語", "fn main() {}"] {
            let tokens = codec.encode(text).unwrap();
            assert_eq!(codec.decode(&tokens).unwrap(), text);
        }
    }

    #[test]
    fn decode_drops_split_character_at_end() {
        let codec = TiktokenCodec::from_vocabulary(Vocabulary::Cl100kBase).unwrap();
        let text = "🎉 party";
        let tokens = codec.encode(text).unwrap();
        // The emoji spans several byte-level tokens.
        assert!(tokens.len() > 2);
        assert_eq!(codec.decode(&tokens[..1]).unwrap(), "");
        for end in 0..=tokens.len() {
            let decoded = codec.decode(&tokens[..end]).unwrap();
            assert!(text.starts_with(&decoded), "prefix {end}: {decoded:?}");
        }
    }

    #[test]
    fn decode_keeps_complete_characters_before_split() {
        let codec = TiktokenCodec::from_vocabulary(Vocabulary::Cl100kBase).unwrap();
        let text = "café 日本語";
        let tokens = codec.encode(text).unwrap();
        for end in 0..=tokens.len() {
            let decoded = codec.decode(&tokens[..end]).unwrap();
            assert!(text.starts_with(&decoded), "prefix {end}: {decoded:?}");
        }
        assert_eq!(codec.decode(&tokens).unwrap(), text);
    }

    #[test]
    fn utf8_prefix_handles_partial_and_invalid_bytes() {
        assert_eq!(utf8_prefix(b"ok".to_vec()), "ok");
        // "é" is C3 A9; a lone C3 at the end is an incomplete character.
        assert_eq!(utf8_prefix(vec![b'a', 0xC3]), "a");
        assert_eq!(utf8_prefix(vec![0xF0, 0x9F, 0x8E]), "");
        // A stray continuation byte in the middle is replaced, not dropped.
        assert_eq!(utf8_prefix(vec![b'a', 0x80, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn special_token_text_is_ordinary() {
        let codec = TiktokenCodec::from_vocabulary(Vocabulary::Cl100kBase).unwrap();
        let tokens = codec.encode("<|endoftext|>").unwrap();
        assert!(tokens.len() > 1);
        assert_eq!(codec.decode(&tokens).unwrap(), "<|endoftext|>");
    }

    #[test]
    fn trait_object_works() {
        let codec: Box<dyn Codec> =
            Box::new(TiktokenCodec::from_vocabulary(Vocabulary::Cl100kBase).unwrap());
        assert_eq!(codec.vocabulary(), "cl100k_base");
        assert_eq!(codec.encode("hello").unwrap().len(), 1);
    }
}
