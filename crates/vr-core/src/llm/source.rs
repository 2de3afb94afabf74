//! Generation source abstraction
//!
//! The streaming core only needs "prompt in, lazy fragments out"; the HTTP
//! client is one implementation, test doubles are another.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error::Result;

use super::client::LlmClient;

/// Lazy, finite, non-restartable sequence of generated text fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Upstream text generation provider
#[async_trait]
pub trait GenerationSource: Send + Sync {
    /// Start generating a reply to `prompt`
    ///
    /// Errors returned here mean the call never started; errors yielded by
    /// the stream mean it failed part way through.
    async fn generate(&self, prompt: &str) -> Result<FragmentStream>;
}

#[async_trait]
impl GenerationSource for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<FragmentStream> {
        self.stream(prompt).await
    }
}

/// Drain a whole reply into one string
pub async fn collect_reply(source: &dyn GenerationSource, prompt: &str) -> Result<String> {
    let mut stream = source.generate(prompt).await?;
    let mut reply = String::new();

    while let Some(fragment) = stream.next().await {
        reply.push_str(&fragment?);
    }

    Ok(reply)
}
