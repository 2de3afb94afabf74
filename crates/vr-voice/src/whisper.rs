//! Speech recognition using the OpenAI Whisper API
//!
//! Transcription is a plain request/response call: audio bytes in, text out.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vr_core::TranscriptionConfig;

use crate::error::{Result, VoiceError};

/// File extensions accepted for upload
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "m4a", "webm"];

/// Whether `filename` has one of the accepted audio extensions
pub fn is_supported_audio(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// MIME type for an accepted audio file name
pub fn mime_for(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        _ => "audio/mpeg",
    }
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Configuration for Whisper client
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// API key
    pub api_key: String,
    /// Model to use (e.g., "whisper-1")
    pub model: String,
    /// Language hint (ISO 639-1 code, e.g., "en", "ja")
    pub language: Option<String>,
    /// Prompt to guide transcription
    pub prompt: Option<String>,
    /// Override for the API base URL
    pub base_url: Option<String>,
}

impl WhisperConfig {
    /// Create a new OpenAI Whisper configuration
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "whisper-1".to_string(),
            language: None,
            prompt: None,
            base_url: None,
        }
    }

    /// Settings from the transcription section
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        let mut whisper = Self::openai(config.api_key.clone().unwrap_or_default());
        whisper.model = config.model.clone();
        whisper.language = config.language.clone();
        whisper
    }

    /// Set language hint
    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }

    /// Set prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set a custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("https://api.openai.com/v1")
    }
}

/// Transcription result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Transcribed text
    pub text: String,
    /// Language detected (if available)
    #[serde(default)]
    pub language: Option<String>,
    /// Duration in seconds (if available)
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Audio bytes to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_data: &[u8], filename: &str) -> Result<String>;
}

/// Whisper client for speech recognition
pub struct WhisperClient {
    client: Client,
    config: WhisperConfig,
}

impl WhisperClient {
    /// Create a new Whisper client
    pub fn new(config: WhisperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| VoiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Transcribe audio from bytes
    pub async fn transcribe_full(
        &self,
        audio_data: &[u8],
        filename: &str,
    ) -> Result<TranscriptionResult> {
        if !is_supported_audio(filename) {
            return Err(VoiceError::InvalidFormat(filename.to_string()));
        }

        let url = format!("{}/audio/transcriptions", self.config.base_url());

        info!("Transcribing audio: {} bytes, filename: {}", audio_data.len(), filename);
        debug!("Using model: {}", self.config.model);

        let file = reqwest::multipart::Part::bytes(audio_data.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))
            .map_err(|e| VoiceError::InvalidFormat(format!("Failed to set mime type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json".to_string())
            .part("file", file);

        if let Some(ref lang) = self.config.language {
            form = form.text("language", lang.clone());
        }

        if let Some(ref prompt) = self.config.prompt {
            form = form.text("prompt", prompt.clone());
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::ApiError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::RecognitionFailed(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let result: TranscriptionResult = response.json().await.map_err(|e| {
            VoiceError::RecognitionFailed(format!("Failed to parse response: {}", e))
        })?;

        info!(
            "Transcription complete: {} characters, language: {:?}",
            result.text.chars().count(),
            result.language
        );

        Ok(result)
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio_data: &[u8], filename: &str) -> Result<String> {
        Ok(self.transcribe_full(audio_data, filename).await?.text)
    }
}
