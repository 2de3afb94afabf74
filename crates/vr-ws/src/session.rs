//! Conversation turn orchestration
//!
//! One turn = one text input. The orchestrator wires a generation fan-out
//! to two sinks (text relay and synthesis), runs the three workers on a
//! [`WorkerPool`] and sends exactly one `stream_complete` once all of them
//! have finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{Instrument, debug, info, info_span, warn};
use vr_core::fanout::{self, FanoutItem, FanoutReceiver, FanoutReport};
use vr_core::{
    EventSender, GenerationFanout, GenerationSource, ServerMessage, StreamConfig,
    TransportClosed, WorkerPool,
};
use vr_voice::{
    ChunkSizes, PipelineReport, ProviderChoice, SynthesisPipeline, SynthesisProviders,
    VoiceCatalog,
};

/// User text that starts a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInput {
    pub text: String,
    pub voice: Option<String>,
}

impl TurnInput {
    pub fn new(text: impl Into<String>, voice: Option<String>) -> Self {
        Self {
            text: text.into(),
            voice,
        }
    }
}

/// Summary of a completed turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    pub turn: u64,
    /// Fragments produced by generation
    pub fragments: usize,
    /// Text chunk events delivered
    pub relayed: usize,
    /// Audio chunk events delivered
    pub synthesized: usize,
    /// Chunks dropped after both providers failed
    pub dropped: usize,
    /// Provider selected at the end of the turn
    pub provider: ProviderChoice,
    /// Error events raised by the orchestrator itself
    pub errors: usize,
}

enum WorkerOutput {
    Generation(FanoutReport),
    Synthesis(Result<PipelineReport, TransportClosed>),
    Relay(Result<usize, TransportClosed>),
}

/// Per-connection turn coordinator
///
/// Cheap to clone; collaborators are shared and injected at construction.
#[derive(Clone)]
pub struct SessionOrchestrator {
    session_id: String,
    fanout: GenerationFanout,
    providers: SynthesisProviders,
    catalog: Arc<VoiceCatalog>,
    sizes: ChunkSizes,
    stream: StreamConfig,
    turns: Arc<AtomicU64>,
}

impl SessionOrchestrator {
    pub fn new(
        session_id: impl Into<String>,
        source: Arc<dyn GenerationSource>,
        providers: SynthesisProviders,
        catalog: Arc<VoiceCatalog>,
        sizes: ChunkSizes,
        stream: StreamConfig,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            fanout: GenerationFanout::new(source),
            providers,
            catalog,
            sizes,
            stream,
            turns: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run one turn to its terminal event
    ///
    /// Returns `Err(TransportClosed)` as soon as any worker finds the client
    /// gone; the remaining workers are aborted and nothing else is sent.
    /// Dropping the returned future cancels every worker of the turn.
    pub async fn run_turn(
        &self,
        input: TurnInput,
        events: &EventSender,
    ) -> Result<TurnReport, TransportClosed> {
        let turn = self.turns.fetch_add(1, Ordering::Relaxed) + 1;
        let voice_id = self.catalog.resolve(input.voice.as_deref()).to_string();

        info!(
            "[Session {}] Turn {} started: {} chars, voice {}",
            self.session_id,
            turn,
            input.text.chars().count(),
            voice_id
        );

        let (text_tx, text_rx) = fanout::sink(self.stream.text_buffer);
        let (synth_tx, synth_rx) = fanout::sink(self.stream.synthesis_buffer);

        let mut pool = WorkerPool::new(format!("{}/turn-{}", self.session_id, turn));

        let generation = self.fanout.clone();
        let prompt = input.text;
        pool.spawn("generation", async move {
            WorkerOutput::Generation(generation.run(&prompt, vec![text_tx, synth_tx]).await)
        });

        let pipeline = SynthesisPipeline::new(self.providers.clone(), voice_id, self.sizes);
        let synth_events = events.clone();
        pool.spawn("synthesis", async move {
            WorkerOutput::Synthesis(pipeline.run(synth_rx, synth_events).await)
        });

        let relay_events = events.clone();
        pool.spawn("relay", async move {
            WorkerOutput::Relay(relay_text(text_rx, relay_events).await)
        });

        let mut report = TurnReport {
            turn,
            ..TurnReport::default()
        };
        let mut failures = Vec::new();

        while let Some(exit) = pool.join_next().await {
            match exit.output {
                Some(WorkerOutput::Generation(generated)) => {
                    report.fragments = generated.fragments;
                    if let Some(error) = generated.error {
                        failures.push(format!("Generation failed: {}", error));
                    }
                }
                Some(WorkerOutput::Synthesis(Ok(pipeline))) => {
                    report.synthesized = pipeline.synthesized;
                    report.dropped = pipeline.dropped;
                    report.provider = pipeline.provider;
                }
                Some(WorkerOutput::Relay(Ok(relayed))) => report.relayed = relayed,
                Some(WorkerOutput::Synthesis(Err(closed)))
                | Some(WorkerOutput::Relay(Err(closed))) => {
                    info!(
                        "[Session {}] Client gone during turn {}, cancelling",
                        self.session_id, turn
                    );
                    pool.abort_all();
                    return Err(closed);
                }
                None => {
                    warn!(
                        "[Session {}] Worker {} ended abnormally in turn {}",
                        self.session_id, exit.name, turn
                    );
                    failures.push(format!("Internal error in {} worker", exit.name));
                }
            }
        }

        for failure in failures {
            report.errors += 1;
            events.send(ServerMessage::error(failure))?;
        }
        events.send(ServerMessage::StreamComplete)?;

        info!(
            "[Session {}] Turn {} complete: fragments={}, audio={}, dropped={}, provider={}",
            self.session_id, turn, report.fragments, report.synthesized, report.dropped, report.provider
        );
        Ok(report)
    }
}

/// Forward every fragment to the client as it arrives
async fn relay_text(mut input: FanoutReceiver, events: EventSender) -> Result<usize, TransportClosed> {
    let mut relayed = 0;

    while let Some(item) = input.recv().await {
        match item {
            FanoutItem::Fragment(content) => {
                events.send(ServerMessage::TextChunk { content })?;
                relayed += 1;
            }
            FanoutItem::Complete | FanoutItem::Failed(_) => break,
        }
    }

    debug!("Text relay finished: {} fragments", relayed);
    Ok(relayed)
}

/// Run queued turns one after another until the client goes away
pub async fn run_turns(
    orchestrator: SessionOrchestrator,
    mut inputs: tokio::sync::mpsc::Receiver<TurnInput>,
    events: EventSender,
) {
    let span = info_span!("session", id = %orchestrator.session_id());

    async move {
        while let Some(input) = inputs.recv().await {
            if orchestrator.run_turn(input, &events).await.is_err() {
                break;
            }
        }
        debug!("Turn loop ended");
    }
    .instrument(span)
    .await
}
