//! vr-core: Voice Relay Core Library
//!
//! LLMストリーミング、生成結果のファンアウト、ワーカー管理、
//! クライアント向けイベントのコア機能を提供します。

pub mod config;
pub mod error;
pub mod event;
pub mod fanout;
pub mod llm;
pub mod worker;

pub use config::{
    Config, LlmConfig, LlmProvider, ServerConfig, SpeechConfig, StreamConfig,
    TranscriptionConfig, VoiceEntry, VoicesConfig,
};
pub use error::{Error, Result};
pub use event::{EventSender, ServerMessage, TransportClosed};
pub use fanout::{FanoutItem, FanoutReceiver, FanoutReport, FanoutSender, GenerationFanout};
pub use llm::{FragmentStream, GenerationSource, LlmClient, Message, collect_reply};
pub use worker::{WorkerExit, WorkerPool};
