//! Generation fan-out
//!
//! Drives one upstream generation call and copies every fragment, in
//! order, to each of an ordered set of sinks. Every sink ends with exactly
//! one terminal item.
//!
//! A sink is either unbounded or bounded. A full bounded sink suspends the
//! whole loop, so every other sink sees the delay too (never a reordering).
//! Unbounded sinks never suspend it.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::llm::GenerationSource;

/// One item delivered to a fan-out sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanoutItem {
    /// Next generated fragment
    Fragment(String),
    /// Upstream finished normally
    Complete,
    /// Upstream failed; no more fragments will follow
    Failed(String),
}

impl FanoutItem {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Fragment(_))
    }
}

/// Write half of a fan-out sink
#[derive(Debug, Clone)]
pub enum FanoutSender {
    Bounded(mpsc::Sender<FanoutItem>),
    Unbounded(mpsc::UnboundedSender<FanoutItem>),
}

impl FanoutSender {
    /// Deliver one item, waiting for room on a bounded sink.
    /// Returns `false` once the receiver is gone.
    pub async fn deliver(&self, item: FanoutItem) -> bool {
        match self {
            Self::Bounded(tx) => tx.send(item).await.is_ok(),
            Self::Unbounded(tx) => tx.send(item).is_ok(),
        }
    }
}

/// Read half of a fan-out sink
#[derive(Debug)]
pub enum FanoutReceiver {
    Bounded(mpsc::Receiver<FanoutItem>),
    Unbounded(mpsc::UnboundedReceiver<FanoutItem>),
}

impl FanoutReceiver {
    pub async fn recv(&mut self) -> Option<FanoutItem> {
        match self {
            Self::Bounded(rx) => rx.recv().await,
            Self::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Items currently buffered
    pub fn len(&self) -> usize {
        match self {
            Self::Bounded(rx) => rx.len(),
            Self::Unbounded(rx) => rx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Summary of one fan-out run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Non-empty fragments produced upstream and forwarded
    pub fragments: usize,
    /// Upstream error, if generation failed
    pub error: Option<String>,
    /// Sinks whose receiver was gone before the run ended
    pub closed_sinks: usize,
}

impl FanoutReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Forwards one generation run to several consumers
#[derive(Clone)]
pub struct GenerationFanout {
    source: Arc<dyn GenerationSource>,
}

impl GenerationFanout {
    pub fn new(source: Arc<dyn GenerationSource>) -> Self {
        Self { source }
    }

    /// Run generation for `prompt`, feeding every sink
    ///
    /// Sink `k` receives fragment `i` only after every earlier sink has
    /// accepted it, and no sink receives fragment `i + 1` before all sinks
    /// have fragment `i`. A sink whose receiver has been dropped is skipped
    /// from then on. If every receiver is gone the upstream call is abandoned.
    pub async fn run(&self, prompt: &str, sinks: Vec<FanoutSender>) -> FanoutReport {
        let mut sinks: Vec<Option<FanoutSender>> = sinks.into_iter().map(Some).collect();
        let mut report = FanoutReport::default();

        let outcome = match self.source.generate(prompt).await {
            Ok(mut stream) => loop {
                match stream.next().await {
                    Some(Ok(fragment)) => {
                        if fragment.is_empty() {
                            continue;
                        }
                        report.fragments += 1;

                        if !forward(&mut sinks, FanoutItem::Fragment(fragment)).await {
                            debug!("All fan-out sinks closed, abandoning generation");
                            break FanoutItem::Complete;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Generation failed mid-stream: {}", e);
                        break FanoutItem::Failed(e.to_string());
                    }
                    None => break FanoutItem::Complete,
                }
            },
            Err(e) => {
                warn!("Generation failed to start: {}", e);
                FanoutItem::Failed(e.to_string())
            }
        };

        if let FanoutItem::Failed(message) = &outcome {
            report.error = Some(message.clone());
        }
        forward(&mut sinks, outcome).await;

        report.closed_sinks = sinks.iter().filter(|s| s.is_none()).count();
        debug!(
            "Fan-out finished: fragments={}, closed_sinks={}",
            report.fragments, report.closed_sinks
        );
        report
    }
}

/// Send `item` to every open sink in order; returns whether any sink is still open
async fn forward(sinks: &mut [Option<FanoutSender>], item: FanoutItem) -> bool {
    for slot in sinks.iter_mut() {
        let closed = match slot {
            Some(sink) => !sink.deliver(item.clone()).await,
            None => continue,
        };
        if closed {
            *slot = None;
        }
    }
    sinks.iter().any(Option::is_some)
}

/// Fan-out sink; `None` means unbounded
pub fn sink(capacity: Option<usize>) -> (FanoutSender, FanoutReceiver) {
    match capacity {
        Some(capacity) => bounded(capacity),
        None => unbounded(),
    }
}

/// Bounded sink; a full sink suspends the fan-out
pub fn bounded(capacity: usize) -> (FanoutSender, FanoutReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (FanoutSender::Bounded(tx), FanoutReceiver::Bounded(rx))
}

/// Unbounded sink; never suspends the fan-out
pub fn unbounded() -> (FanoutSender, FanoutReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FanoutSender::Unbounded(tx), FanoutReceiver::Unbounded(rx))
}
