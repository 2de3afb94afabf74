//! Speech synthesis provider abstraction

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;

/// Which synthesis provider a pipeline is using
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    /// Low-latency provider with voice selection
    #[default]
    Primary,
    /// Single fixed voice backstop
    Fallback,
}

impl fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "Primary"),
            Self::Fallback => write!(f, "Fallback"),
        }
    }
}

/// Audio produced for exactly one text chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    /// Encoded audio bytes
    pub audio_data: Vec<u8>,
    /// MIME type reported by the provider
    pub content_type: String,
    /// Chunk text the audio was produced from
    pub text: String,
    /// Provider that produced it
    pub provider: ProviderChoice,
}

/// Text chunk to audio
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Role this provider plays in a pipeline
    fn choice(&self) -> ProviderChoice;

    /// Synthesize one chunk; `voice_id` is ignored by providers with a fixed voice
    async fn synthesize(&self, text: &str, voice_id: &str)
    -> Result<AudioPayload, SynthesisError>;
}

/// The provider pair handed to every synthesis pipeline
#[derive(Clone)]
pub struct SynthesisProviders {
    pub primary: Arc<dyn SynthesisProvider>,
    pub fallback: Arc<dyn SynthesisProvider>,
}

impl SynthesisProviders {
    pub fn new(primary: Arc<dyn SynthesisProvider>, fallback: Arc<dyn SynthesisProvider>) -> Self {
        Self { primary, fallback }
    }

    /// Provider currently selected by `choice`
    pub fn get(&self, choice: ProviderChoice) -> &Arc<dyn SynthesisProvider> {
        match choice {
            ProviderChoice::Primary => &self.primary,
            ProviderChoice::Fallback => &self.fallback,
        }
    }
}
