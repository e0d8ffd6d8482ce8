use std::io;
use thiserror::Error;

/// Core error type for promptbudget.
#[derive(Error, Debug)]
pub enum PromptBudgetError {
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration '{field}': {message}")]
    InvalidConfiguration { field: String, message: String },

    #[error("vocabulary '{vocabulary}' could not be loaded: {message}")]
    CodecUnavailable { vocabulary: String, message: String },

    #[error("encoding error: {message}")]
    Encoding { message: String },

    #[error("decoding error: {message}")]
    Decoding { message: String },
}

impl PromptBudgetError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn codec_unavailable(vocabulary: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CodecUnavailable {
            vocabulary: vocabulary.into(),
            message: message.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Returns true if this error is caused by user input (vs internal/system).
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }

    /// Returns true if retrying the operation might succeed.
    ///
    /// Pipeline stages are deterministic, so only I/O qualifies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, PromptBudgetError>;
