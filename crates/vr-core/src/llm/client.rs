//! LLM API HTTP Client
//!
//! Streams replies from the Claude Messages API or any OpenAI-compatible
//! chat completions endpoint as a sequence of text fragments.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::source::FragmentStream;
use super::sse::{SseDecoder, SseEvent};
use super::types::*;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Streaming LLM client (Claude and OpenAI-compatible APIs)
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider: LlmProvider,
    system_prompt: Option<String>,
    max_tokens: u64,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        // Replies stream for as long as the model talks, so only the
        // connect phase and the gap between reads are bounded.
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(Duration::from_secs(config.read_timeout_secs.max(1)))
            .build()
            .map_err(Error::Http)?;

        let base_url = match &config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match config.provider {
                LlmProvider::Claude => "https://api.anthropic.com/v1".to_string(),
                LlmProvider::OpenAi => "https://api.openai.com/v1".to_string(),
            },
        };

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url,
            provider: config.provider.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Create with custom base URL (for testing or custom endpoints)
    pub fn with_base_url(config: &LlmConfig, base_url: String) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url;
        Ok(client)
    }

    /// Start a streaming reply for a single user prompt
    pub async fn stream(&self, prompt: &str) -> Result<FragmentStream> {
        let request = MessagesRequest::streaming(
            self.model.clone(),
            self.max_tokens,
            self.system_prompt.clone(),
            prompt,
        );

        let response = match self.provider {
            LlmProvider::Claude => self.open_claude_stream(&request).await?,
            LlmProvider::OpenAi => self.open_openai_stream(&request).await?,
        };

        info!("LLM stream opened: provider={:?}, model={}", self.provider, self.model);

        Ok(decode_fragments(response.bytes_stream(), self.provider.clone()))
    }

    /// Open the Claude Messages stream
    async fn open_claude_stream(&self, request: &MessagesRequest) -> Result<reqwest::Response> {
        let url = format!("{}/messages", self.base_url);

        debug!("Sending streaming request to Claude API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(Error::Http)?;

        check_status(response).await
    }

    /// Open an OpenAI-compatible chat completions stream
    async fn open_openai_stream(&self, request: &MessagesRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!("Sending streaming request to OpenAI-compatible API: {}", url);

        let openai_request = ChatCompletionRequest::from_messages_request(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(Error::Http)?;

        check_status(response).await
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the provider type
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    warn!("LLM API error: {} - {}", status, body);
    Err(Error::LlmApi(format!("{}: {}", status, body)))
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    provider: LlmProvider,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    /// Turn one SSE event into queued fragments; returns false once the stream is over
    fn accept(&mut self, event: SseEvent) -> bool {
        let signal = match self.provider {
            LlmProvider::Claude => StreamSignal::from_claude(&event.data),
            LlmProvider::OpenAi => StreamSignal::from_openai(&event.data),
        };

        match signal {
            Ok(StreamSignal::Fragment(text)) => {
                if !text.is_empty() {
                    self.pending.push_back(Ok(text));
                }
                true
            }
            Ok(StreamSignal::Skip) => true,
            Ok(StreamSignal::Done) => false,
            Err(e) => {
                self.pending.push_back(Err(e));
                false
            }
        }
    }
}

/// Decode an SSE response body into a fragment stream
///
/// Empty deltas are dropped; the stream ends after the provider's
/// end-of-reply marker, after the first error, or when the body ends.
pub fn decode_fragments<S, B>(body: S, provider: LlmProvider) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        provider,
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for event in state.decoder.push(bytes.as_ref()) {
                        if !state.accept(event) {
                            state.finished = true;
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(Error::Http(e)), state));
                }
                None => {
                    state.finished = true;
                    if let Some(event) = state.decoder.finish() {
                        state.accept(event);
                    }
                }
            }
        }
    })
    .boxed()
}
