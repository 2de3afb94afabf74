//! Client-facing stream events
//!
//! Every event the core sends towards a connected client, plus the sender
//! type workers use to deliver them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Message from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One generated text fragment
    TextChunk { content: String },

    /// Synthesized audio for one text chunk
    AudioChunk {
        /// Base64-encoded audio bytes
        audio_data: String,
        /// Chunk text the audio was produced from
        text: String,
    },

    /// Terminal event of a turn
    StreamComplete,

    /// Error message (non-terminal)
    Error { message: String },

    /// Sent once when the connection opens
    SessionInfo {
        session_id: String,
        connected_at: String,
    },

    /// Pong response
    Pong,
}

impl ServerMessage {
    /// Build an audio event from raw bytes
    pub fn audio(audio: &[u8], text: impl Into<String>) -> Self {
        Self::AudioChunk {
            audio_data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, audio),
            text: text.into(),
        }
    }

    /// Build an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether no further event of the turn may follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamComplete)
    }
}

/// The client side of the connection is gone
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("client connection closed")]
pub struct TransportClosed;

/// Outbound event channel of one connection
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl EventSender {
    /// Create a sender/receiver pair
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event for the client
    pub fn send(&self, message: ServerMessage) -> Result<(), TransportClosed> {
        self.tx.send(message).map_err(|_| TransportClosed)
    }

    /// Whether the receiving side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
