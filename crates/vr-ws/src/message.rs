//! WebSocket message types
//!
//! Defines the JSON message format for WebSocket communication. Server
//! events live in `vr_core::event` so the streaming workers can emit them.

use serde::{Deserialize, Serialize};

pub use vr_core::ServerMessage;

/// Message from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a conversation turn
    TextInput {
        text: String,
        /// Catalog key, voice name or voice id
        #[serde(default, alias = "voice_selector", skip_serializing_if = "Option::is_none")]
        voice_id: Option<String>,
    },

    /// Ping for keepalive
    Ping,
}
