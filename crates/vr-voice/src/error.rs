//! Error types for vr-voice

use thiserror::Error;

use crate::provider::ProviderChoice;

/// vr-voice error type
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Speech recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// One failed synthesis call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider} synthesis provider failed: {cause}")]
pub struct SynthesisError {
    /// Provider that failed
    pub provider: ProviderChoice,
    /// Network, auth or quota failure description
    pub cause: String,
}

impl SynthesisError {
    pub fn new(provider: ProviderChoice, cause: impl Into<String>) -> Self {
        Self {
            provider,
            cause: cause.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, VoiceError>;
