//! LLM API types
//!
//! Request bodies for the streaming endpoints and the per-event payloads
//! decoded from their server-sent event streams.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: text.into(),
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: text.into(),
        }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: text.into(),
        }
    }
}

/// Claude Messages API request
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub stream: bool,
}

impl MessagesRequest {
    /// Build a single-turn streaming request
    pub fn streaming(
        model: impl Into<String>,
        max_tokens: u64,
        system: Option<String>,
        prompt: &str,
    ) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            system,
            messages: vec![Message::user(prompt)],
            stream: true,
        }
    }
}

// ============================================================================
// OpenAI-compatible types
// ============================================================================

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Convert from Claude-style request
    pub fn from_messages_request(req: &MessagesRequest) -> Self {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);

        if let Some(system) = &req.system {
            messages.push(Message::system(system));
        }
        messages.extend(req.messages.iter().cloned());

        Self {
            model: req.model.clone(),
            messages,
            max_tokens: Some(req.max_tokens),
            stream: req.stream,
        }
    }
}

// ============================================================================
// Streaming payloads
// ============================================================================

/// Claude streaming event (`data:` payload)
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeStreamEvent {
    ContentBlockDelta { delta: ClaudeDelta },
    MessageStop,
    Error { error: ClaudeApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeApiError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// OpenAI-compatible streaming chunk
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// What one decoded stream event means for the fragment stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// Generated text
    Fragment(String),
    /// Upstream says the reply is finished
    Done,
    /// Keep-alive, metadata or anything else without text
    Skip,
}

impl StreamSignal {
    /// Decode one Claude `data:` payload
    pub fn from_claude(data: &str) -> Result<Self> {
        let event: ClaudeStreamEvent = serde_json::from_str(data)
            .map_err(|e| Error::Stream(format!("Invalid Claude event: {} - {}", e, data)))?;

        match event {
            ClaudeStreamEvent::ContentBlockDelta {
                delta: ClaudeDelta::TextDelta { text },
            } => Ok(Self::Fragment(text)),
            ClaudeStreamEvent::MessageStop => Ok(Self::Done),
            ClaudeStreamEvent::Error { error } => Err(Error::LlmApi(format!(
                "{}: {}",
                error.error_type, error.message
            ))),
            _ => Ok(Self::Skip),
        }
    }

    /// Decode one OpenAI-compatible `data:` payload
    pub fn from_openai(data: &str) -> Result<Self> {
        if data.trim() == "[DONE]" {
            return Ok(Self::Done);
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(data)
            .map_err(|e| Error::Stream(format!("Invalid completion chunk: {} - {}", e, data)))?;

        match chunk.choices.into_iter().next() {
            Some(choice) => match choice.delta.content {
                Some(text) => Ok(Self::Fragment(text)),
                None => Ok(Self::Skip),
            },
            None => Ok(Self::Skip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_request_serialization() {
        let req = MessagesRequest::streaming("claude-test", 256, None, "Say hello");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Say hello");
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_chat_completion_request_adds_system() {
        let req = MessagesRequest::streaming(
            "gpt-4o-mini",
            128,
            Some("Be brief.".to_string()),
            "Say hello",
        );
        let openai = ChatCompletionRequest::from_messages_request(&req);
        assert_eq!(openai.messages.len(), 2);
        assert_eq!(openai.messages[0], Message::system("Be brief."));
        assert_eq!(openai.messages[1], Message::user("Say hello"));
        assert!(openai.stream);
    }

    #[test]
    fn test_claude_text_delta() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#;
        assert_eq!(
            StreamSignal::from_claude(data).unwrap(),
            StreamSignal::Fragment("Hel".to_string())
        );
    }

    #[test]
    fn test_claude_metadata_and_stop() {
        let ping = r#"{"type":"ping"}"#;
        assert_eq!(StreamSignal::from_claude(ping).unwrap(), StreamSignal::Skip);

        let stop = r#"{"type":"message_stop"}"#;
        assert_eq!(StreamSignal::from_claude(stop).unwrap(), StreamSignal::Done);
    }

    #[test]
    fn test_claude_error_event() {
        let data = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = StreamSignal::from_claude(data).unwrap_err();
        assert!(err.to_string().contains("overloaded_error"));
    }

    #[test]
    fn test_openai_chunk() {
        let data = r#"{"id":"x","choices":[{"index":0,"delta":{"content":"lo wor"},"finish_reason":null}]}"#;
        assert_eq!(
            StreamSignal::from_openai(data).unwrap(),
            StreamSignal::Fragment("lo wor".to_string())
        );

        let role_only = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(StreamSignal::from_openai(role_only).unwrap(), StreamSignal::Skip);
    }

    #[test]
    fn test_openai_done() {
        assert_eq!(StreamSignal::from_openai("[DONE]").unwrap(), StreamSignal::Done);
    }

    #[test]
    fn test_openai_invalid_payload() {
        assert!(matches!(
            StreamSignal::from_openai("{not json"),
            Err(Error::Stream(_))
        ));
    }
}
