//! Text cleanup applied to a raw prompt before encoding.

/// Deterministic, total text transformation. Implementations must be
/// idempotent: normalizing an already normalized prompt is a no-op.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str) -> String;
}

/// Strips leading and trailing whitespace and nothing else. Case, inner
/// spacing and content are preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceNormalizer;

impl Normalizer for WhitespaceNormalizer {
    fn normalize(&self, text: &str) -> String {
        text.trim().to_string()
    }
}
