//! Error types for vr-ws

use thiserror::Error;

/// Server error type
#[derive(Error, Debug)]
pub enum WsError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] vr_core::Error),

    #[error("Voice error: {0}")]
    Voice(#[from] vr_voice::VoiceError),

    #[error(transparent)]
    Transport(#[from] vr_core::TransportClosed),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for vr-ws
pub type Result<T> = std::result::Result<T, WsError>;
