//! Text-to-Speech synthesis
//!
//! Supports two providers:
//! - ElevenLabs API (primary, per-request voice selection)
//! - OpenAI TTS API (fallback, one fixed voice)

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use vr_core::SpeechConfig;

use crate::error::{Result, SynthesisError, VoiceError};
use crate::provider::{AudioPayload, ProviderChoice, SynthesisProvider};

/// TTS API provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtsProvider {
    /// OpenAI TTS API
    OpenAi,
    /// ElevenLabs API
    ElevenLabs,
}

/// TTS configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// API key
    pub api_key: String,
    /// Provider to use
    pub provider: TtsProvider,
    /// Pipeline role of this client
    pub role: ProviderChoice,
    /// Model to use
    pub model: String,
    /// Fixed voice (OpenAI only; ElevenLabs takes the voice per request)
    pub voice: String,
    /// ElevenLabs output format, e.g. "mp3_44100_128"
    pub output_format: String,
    /// Override for the provider base URL
    pub base_url: Option<String>,
}

impl TtsConfig {
    /// Create a new OpenAI TTS configuration
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            provider: TtsProvider::OpenAi,
            role: ProviderChoice::Fallback,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            output_format: "mp3_44100_128".to_string(),
            base_url: None,
        }
    }

    /// Create a new ElevenLabs TTS configuration
    pub fn elevenlabs(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            provider: TtsProvider::ElevenLabs,
            role: ProviderChoice::Primary,
            model: "eleven_multilingual_v2".to_string(),
            voice: String::new(),
            output_format: "mp3_44100_128".to_string(),
            base_url: None,
        }
    }

    /// Primary provider settings from the speech section
    pub fn primary(speech: &SpeechConfig) -> Self {
        let mut config = Self::elevenlabs(speech.elevenlabs_api_key.clone());
        config.model = speech.elevenlabs_model.clone();
        config.output_format = speech.output_format.clone();
        config
    }

    /// Fallback provider settings from the speech section
    pub fn fallback(speech: &SpeechConfig) -> Self {
        Self::openai(speech.openai_api_key.clone().unwrap_or_default())
            .with_model(speech.fallback_model.clone())
            .with_voice(speech.fallback_voice.clone())
    }

    /// Set model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set voice
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Set a custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Get the API base URL for the provider
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.base_url {
            return url;
        }
        match &self.provider {
            TtsProvider::OpenAi => "https://api.openai.com/v1",
            TtsProvider::ElevenLabs => "https://api.elevenlabs.io/v1",
        }
    }
}

/// TTS client for speech synthesis
pub struct TtsClient {
    client: Client,
    config: TtsConfig,
}

impl TtsClient {
    /// Create a new TTS client
    pub fn new(config: TtsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| VoiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    fn fail(&self, cause: impl Into<String>) -> SynthesisError {
        SynthesisError::new(self.config.role, cause)
    }

    /// Synthesize speech for one text chunk
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> std::result::Result<AudioPayload, SynthesisError> {
        let request = match &self.config.provider {
            TtsProvider::OpenAi => self.openai_request(text),
            TtsProvider::ElevenLabs => self.elevenlabs_request(text, voice_id)?,
        };

        let response = request
            .send()
            .await
            .map_err(|e| self.fail(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(self.fail(format!("API error {}: {}", status, error_text)));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| self.fail(format!("Failed to read audio data: {}", e)))?;

        info!(
            "Synthesis complete: {} bytes, content-type: {}",
            audio_data.len(),
            content_type
        );

        Ok(AudioPayload {
            audio_data: audio_data.to_vec(),
            content_type,
            text: text.to_string(),
            provider: self.config.role,
        })
    }

    /// Build an OpenAI TTS API request
    fn openai_request(&self, text: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/audio/speech", self.config.base_url());

        debug!(
            "Synthesizing {} chars using OpenAI (model: {}, voice: {})",
            text.chars().count(),
            self.config.model,
            self.config.voice
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": self.config.voice,
            "response_format": "mp3",
        });

        self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
    }

    /// Build an ElevenLabs API request
    fn elevenlabs_request(
        &self,
        text: &str,
        voice_id: &str,
    ) -> std::result::Result<reqwest::RequestBuilder, SynthesisError> {
        if voice_id.is_empty() {
            return Err(self.fail("ElevenLabs requires a voice id"));
        }

        let url = format!("{}/text-to-speech/{}", self.config.base_url(), voice_id);

        debug!(
            "Synthesizing {} chars using ElevenLabs (model: {}, voice: {})",
            text.chars().count(),
            self.config.model,
            voice_id
        );

        let body = serde_json::json!({
            "text": text,
            "model_id": self.config.model,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
            }
        });

        Ok(self
            .client
            .post(&url)
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&body))
    }
}

#[async_trait]
impl SynthesisProvider for TtsClient {
    fn name(&self) -> &str {
        match self.config.provider {
            TtsProvider::OpenAi => "openai",
            TtsProvider::ElevenLabs => "elevenlabs",
        }
    }

    fn choice(&self) -> ProviderChoice {
        self.config.role
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> std::result::Result<AudioPayload, SynthesisError> {
        TtsClient::synthesize(self, text, voice_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_config_openai() {
        let config = TtsConfig::openai("test-key");
        assert_eq!(config.provider, TtsProvider::OpenAi);
        assert_eq!(config.role, ProviderChoice::Fallback);
        assert_eq!(config.model, "tts-1");
        assert_eq!(config.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_tts_config_elevenlabs() {
        let config = TtsConfig::elevenlabs("test-key");
        assert_eq!(config.provider, TtsProvider::ElevenLabs);
        assert_eq!(config.role, ProviderChoice::Primary);
        assert_eq!(config.model, "eleven_multilingual_v2");
        assert_eq!(config.base_url(), "https://api.elevenlabs.io/v1");
    }

    #[test]
    fn test_tts_config_from_speech_config() {
        let speech = SpeechConfig {
            elevenlabs_api_key: "el-key".to_string(),
            openai_api_key: Some("oa-key".to_string()),
            fallback_voice: "nova".to_string(),
            ..SpeechConfig::default()
        };

        let primary = TtsConfig::primary(&speech);
        assert_eq!(primary.api_key, "el-key");
        assert_eq!(primary.output_format, "mp3_44100_128");

        let fallback = TtsConfig::fallback(&speech);
        assert_eq!(fallback.api_key, "oa-key");
        assert_eq!(fallback.voice, "nova");
        assert_eq!(fallback.model, "tts-1");
    }

    #[test]
    fn test_tts_config_with_options() {
        let config = TtsConfig::openai("test-key")
            .with_voice("nova")
            .with_model("tts-1-hd")
            .with_base_url("http://localhost:9000/v1/");

        assert_eq!(config.voice, "nova");
        assert_eq!(config.model, "tts-1-hd");
        assert_eq!(config.base_url(), "http://localhost:9000/v1");
    }

    #[tokio::test]
    async fn test_elevenlabs_requires_voice_id() {
        let client = TtsClient::new(TtsConfig::elevenlabs("test-key")).unwrap();
        let err = client.synthesize("Hello.", "").await.unwrap_err();
        assert_eq!(err.provider, ProviderChoice::Primary);
        assert!(err.cause.contains("voice id"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_names_role() {
        let config = TtsConfig::openai("test-key").with_base_url("http://127.0.0.1:9");
        let client = TtsClient::new(config).unwrap();
        assert_eq!(SynthesisProvider::name(&client), "openai");

        let err = client.synthesize("Hello.", "ignored").await.unwrap_err();
        assert_eq!(err.provider, ProviderChoice::Fallback);
        assert!(err.cause.starts_with("Request failed"));
    }
}
