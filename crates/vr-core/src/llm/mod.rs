//! LLM API client and streaming types
//!
//! Supports both Claude API and OpenAI-compatible APIs

mod client;
mod source;
mod sse;
mod types;

pub use client::{decode_fragments, LlmClient};
pub use source::{collect_reply, FragmentStream, GenerationSource};
pub use sse::{SseDecoder, SseEvent};
pub use types::*;
