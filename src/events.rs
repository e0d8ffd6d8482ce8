//! Observability events emitted at pipeline stage boundaries.
//!
//! Components never call a logger directly; they receive an [`EventSink`]
//! and report [`PipelineEvent`]s to it. The binary wires in a
//! [`TracingSink`], tests use a [`MemorySink`] to assert on what was
//! reported. Events are informational and never affect control flow.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::Level;

use crate::codec::TokenId;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Which side of the truncation step a count was taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStage {
    BeforeTruncation,
    AfterTruncation,
}

/// A single observability event. Borrows from the pipeline's values so
/// emitting one never copies token sequences.
#[derive(Debug, Clone, Copy)]
pub enum PipelineEvent<'a> {
    /// The requested model resolved to a known vocabulary.
    CodecReady { model: &'a str, vocabulary: &'a str },
    /// The requested model was unknown and the default vocabulary was used.
    CodecFallback { model: &'a str, vocabulary: &'a str },
    Normalized { prompt: &'a str },
    Encoded { tokens: &'a [TokenId] },
    Counted { stage: CountStage, count: usize },
    Truncated { limit: usize, dropped: usize },
}

impl PipelineEvent<'_> {
    /// Severity of this event.
    pub fn level(&self) -> Level {
        match self {
            Self::CodecFallback { .. } => Level::WARN,
            Self::Normalized { .. } | Self::Encoded { .. } => Level::DEBUG,
            Self::CodecReady { .. } | Self::Counted { .. } | Self::Truncated { .. } => Level::INFO,
        }
    }
}

impl fmt::Display for PipelineEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CodecReady { model, vocabulary } => {
                write!(f, "initialized encoding for model {model} ({vocabulary})")
            }
            Self::CodecFallback { model, vocabulary } => write!(
                f,
                "no encoding known for model {model}; falling back to {vocabulary}"
            ),
            Self::Normalized { prompt } => write!(f, "normalized prompt: {prompt:?}"),
            Self::Encoded { tokens } => write!(f, "encoded prompt: {tokens:?}"),
            Self::Counted {
                stage: CountStage::BeforeTruncation,
                count,
            } => write!(f, "tokens before truncation: {count}"),
            Self::Counted {
                stage: CountStage::AfterTruncation,
                count,
            } => write!(f, "tokens after truncation: {count}"),
            Self::Truncated { limit, dropped } => {
                write!(f, "truncated tokens to limit {limit} (dropped {dropped})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receives pipeline events. Must be shareable across threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent<'_>);
}

/// Forwards events to the process-wide `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent<'_>) {
        let level = event.level();
        if level == Level::WARN {
            tracing::warn!("{event}");
        } else if level == Level::INFO {
            tracing::info!("{event}");
        } else {
            tracing::debug!("{event}");
        }
    }
}

/// An event captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub level: Level,
    pub message: String,
}

/// Records every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events recorded at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<RecordedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &PipelineEvent<'_>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                level: event.level(),
                message: event.to_string(),
            });
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &PipelineEvent<'_>) {}
}
