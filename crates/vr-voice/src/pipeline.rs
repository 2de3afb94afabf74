//! Synthesis pipeline
//!
//! Consumes the fragment sink of one turn, segments it into chunks and
//! synthesizes each chunk in order, emitting one `audio_chunk` event per
//! success.
//!
//! Provider selection is sticky per turn. The first Primary failure
//! switches the pipeline to Fallback for good and the failed chunk is
//! retried once there. A chunk that fails on Fallback is dropped with an
//! `error` event and the pipeline moves on.

use tracing::{debug, info, warn};
use vr_core::{EventSender, FanoutItem, FanoutReceiver, ServerMessage, TransportClosed};

use crate::error::SynthesisError;
use crate::provider::{AudioPayload, ProviderChoice, SynthesisProviders};
use crate::segmenter::{ChunkSegmenter, FALLBACK_CHUNK_SIZE, PRIMARY_CHUNK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    AwaitingChunk,
    Synthesizing,
    Emitting,
    /// Input ended and every chunk was synthesized
    Done,
    /// Input ended and at least one chunk failed on both providers
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Chunk thresholds per provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSizes {
    pub primary: usize,
    pub fallback: usize,
}

impl ChunkSizes {
    pub fn for_choice(&self, choice: ProviderChoice) -> usize {
        match choice {
            ProviderChoice::Primary => self.primary,
            ProviderChoice::Fallback => self.fallback,
        }
    }
}

impl Default for ChunkSizes {
    fn default() -> Self {
        Self {
            primary: PRIMARY_CHUNK_SIZE,
            fallback: FALLBACK_CHUNK_SIZE,
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub state: PipelineState,
    /// Chunks delivered as audio
    pub synthesized: usize,
    /// Chunks dropped after both providers failed
    pub dropped: usize,
    /// Provider selected when the run ended
    pub provider: ProviderChoice,
    /// Upstream generation error seen on the input sink
    pub upstream_error: Option<String>,
}

pub struct SynthesisPipeline {
    providers: SynthesisProviders,
    voice_id: String,
    sizes: ChunkSizes,
    segmenter: ChunkSegmenter,
    choice: ProviderChoice,
    state: PipelineState,
    synthesized: usize,
    dropped: usize,
}

impl SynthesisPipeline {
    pub fn new(providers: SynthesisProviders, voice_id: impl Into<String>, sizes: ChunkSizes) -> Self {
        Self {
            providers,
            voice_id: voice_id.into(),
            sizes,
            segmenter: ChunkSegmenter::new(sizes.primary),
            choice: ProviderChoice::Primary,
            state: PipelineState::AwaitingChunk,
            synthesized: 0,
            dropped: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn provider(&self) -> ProviderChoice {
        self.choice
    }

    /// Drive the pipeline until its input sink ends
    ///
    /// Only a closed client sink ends the run early.
    pub async fn run(
        mut self,
        mut input: FanoutReceiver,
        events: EventSender,
    ) -> Result<PipelineReport, TransportClosed> {
        let mut upstream_error = None;

        loop {
            self.state = PipelineState::AwaitingChunk;

            match input.recv().await {
                Some(FanoutItem::Fragment(fragment)) => {
                    if let Some(chunk) = self.segmenter.feed(&fragment) {
                        self.process(chunk, &events).await?;
                    }
                }
                Some(FanoutItem::Failed(message)) => {
                    debug!("Synthesis input ended with upstream failure: {}", message);
                    upstream_error = Some(message);
                    break;
                }
                Some(FanoutItem::Complete) | None => break,
            }
        }

        if let Some(chunk) = self.segmenter.flush() {
            self.process(chunk, &events).await?;
        }

        self.state = if self.dropped > 0 {
            PipelineState::Failed
        } else {
            PipelineState::Done
        };

        info!(
            "Synthesis finished: synthesized={}, dropped={}, provider={}",
            self.synthesized, self.dropped, self.choice
        );

        Ok(PipelineReport {
            state: self.state,
            synthesized: self.synthesized,
            dropped: self.dropped,
            provider: self.choice,
            upstream_error,
        })
    }

    /// Synthesize one chunk on the selected provider, escalating once
    async fn process(&mut self, chunk: String, events: &EventSender) -> Result<(), TransportClosed> {
        self.state = PipelineState::Synthesizing;

        let result = match self.attempt(&chunk).await {
            Err(err) if self.choice == ProviderChoice::Primary => {
                warn!("{}; switching to fallback for the rest of the turn", err);
                events.send(ServerMessage::error(format!(
                    "{}. Switching to fallback provider.",
                    err
                )))?;

                self.choice = ProviderChoice::Fallback;
                self.segmenter
                    .set_chunk_size(self.sizes.for_choice(ProviderChoice::Fallback));

                self.attempt(&chunk).await
            }
            other => other,
        };

        match result {
            Ok(audio) => {
                self.state = PipelineState::Emitting;
                self.synthesized += 1;
                debug!(
                    "Audio chunk ready: {} bytes for {:?}",
                    audio.audio_data.len(),
                    chunk
                );
                events.send(ServerMessage::audio(&audio.audio_data, chunk))?;
            }
            Err(err) => {
                warn!("Dropping chunk {:?}: {}", chunk, err);
                self.dropped += 1;
                events.send(ServerMessage::error(format!(
                    "{}. Skipped text: {}",
                    err, chunk
                )))?;
            }
        }

        Ok(())
    }

    async fn attempt(&self, chunk: &str) -> Result<AudioPayload, SynthesisError> {
        let provider = self.providers.get(self.choice);
        debug!(
            "Synthesizing {} chars with {} ({})",
            chunk.chars().count(),
            provider.name(),
            self.choice
        );
        provider.synthesize(chunk, &self.voice_id).await
    }
}
