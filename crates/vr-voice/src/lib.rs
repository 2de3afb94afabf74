//! vr-voice: Speech synthesis and recognition for voice-relay
//!
//! This crate turns generated text into ordered audio and uploaded audio
//! into text.
//!
//! ## Features
//!
//! - **Segmentation**: fragments grouped into speakable chunks
//! - **Synthesis pipeline**: per-turn chunk synthesis with sticky fallback
//! - **Text-to-Speech**: ElevenLabs (primary) and OpenAI TTS (fallback)
//! - **Speech Recognition**: OpenAI Whisper API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vr_voice::{ChunkSizes, SynthesisPipeline, SynthesisProviders, TtsClient, TtsConfig};
//!
//! let speech = vr_core::SpeechConfig::default();
//! let providers = SynthesisProviders::new(
//!     Arc::new(TtsClient::new(TtsConfig::primary(&speech))?),
//!     Arc::new(TtsClient::new(TtsConfig::fallback(&speech))?),
//! );
//!
//! let pipeline = SynthesisPipeline::new(providers, "21m00Tcm4TlvDq8ikWAM", ChunkSizes::default());
//! let report = pipeline.run(fragment_rx, events).await?;
//! ```

pub mod catalog;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod segmenter;
pub mod tts;
pub mod whisper;

pub use catalog::{VoiceCatalog, VoiceInfo};
pub use error::{Result, SynthesisError, VoiceError};
pub use pipeline::{ChunkSizes, PipelineReport, PipelineState, SynthesisPipeline};
pub use provider::{AudioPayload, ProviderChoice, SynthesisProvider, SynthesisProviders};
pub use segmenter::{ChunkSegmenter, FALLBACK_CHUNK_SIZE, PRIMARY_CHUNK_SIZE};
pub use tts::{TtsClient, TtsConfig, TtsProvider};
pub use whisper::{
    SUPPORTED_EXTENSIONS, Transcriber, TranscriptionResult, WhisperClient, WhisperConfig,
    is_supported_audio, mime_for,
};
