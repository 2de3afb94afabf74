//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. voice-relay.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Default config file looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "voice-relay.toml";

/// LLM Provider type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Claude API
    Claude,
    /// OpenAI-compatible API
    #[default]
    OpenAi,
}

impl LlmProvider {
    /// Parse a provider name; anything unknown is treated as OpenAI-compatible
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "claude" | "anthropic" => LlmProvider::Claude,
            _ => LlmProvider::OpenAi,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// API provider
    #[serde(default)]
    pub provider: LlmProvider,

    /// Base URL (optional, for custom endpoints)
    #[serde(default)]
    pub base_url: Option<String>,

    /// System prompt prepended to every turn
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Maximum tokens generated per turn
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    /// Longest allowed silence between two reads of a streaming reply.
    /// There is no deadline on the reply as a whole.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            provider: LlmProvider::OpenAi,
            base_url: None,
            system_prompt: None,
            max_tokens: default_max_tokens(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

/// Speech synthesis configuration (primary ElevenLabs, fallback OpenAI TTS)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// ElevenLabs API key (primary provider)
    #[serde(default)]
    pub elevenlabs_api_key: String,

    /// ElevenLabs model id
    #[serde(default = "default_elevenlabs_model")]
    pub elevenlabs_model: String,

    /// ElevenLabs output format
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// OpenAI API key for the fallback provider (defaults to the LLM key)
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI TTS model for the fallback provider
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    /// Fixed voice used by the fallback provider
    #[serde(default = "default_fallback_voice")]
    pub fallback_voice: String,

    /// Chunk threshold while the primary provider is in use
    #[serde(default = "default_primary_chunk_size")]
    pub primary_chunk_size: usize,

    /// Chunk threshold once the session has fallen back
    #[serde(default = "default_fallback_chunk_size")]
    pub fallback_chunk_size: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: String::new(),
            elevenlabs_model: default_elevenlabs_model(),
            output_format: default_output_format(),
            openai_api_key: None,
            fallback_model: default_fallback_model(),
            fallback_voice: default_fallback_voice(),
            primary_chunk_size: default_primary_chunk_size(),
            fallback_chunk_size: default_fallback_chunk_size(),
        }
    }
}

/// Speech recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// API key (defaults to the OpenAI key)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Whisper model
    #[serde(default = "default_whisper_model")]
    pub model: String,

    /// Language hint (ISO 639-1)
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_whisper_model(),
            language: None,
        }
    }
}

/// Streaming core tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Capacity of the fragment channel feeding the synthesis pipeline.
    /// Unbounded when unset; a bound makes slow synthesis throttle the
    /// whole fan-out, text relay included.
    #[serde(default)]
    pub synthesis_buffer: Option<usize>,

    /// Capacity of the fragment channel feeding the text relay
    #[serde(default = "default_text_buffer")]
    pub text_buffer: Option<usize>,

    /// Text inputs that may wait behind the active turn
    #[serde(default = "default_max_queued_inputs")]
    pub max_queued_inputs: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            synthesis_buffer: None,
            text_buffer: default_text_buffer(),
            max_queued_inputs: default_max_queued_inputs(),
        }
    }
}

/// HTTP / WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served as static files (frontend build)
    #[serde(default)]
    pub static_dir: Option<String>,

    /// Allowed CORS origins; any origin when unset
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: None,
            allowed_origins: None,
        }
    }
}

/// One selectable voice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceEntry {
    /// Short selector key ("1", "2", ...)
    pub key: String,
    /// Provider voice id
    pub id: String,
    /// Display name
    pub name: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
}

/// Voice catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicesConfig {
    /// Voice id used when the selector is missing or unknown
    #[serde(default = "default_voice_id")]
    pub default_voice_id: String,

    /// Catalog entries
    #[serde(default = "default_voice_entries")]
    pub entries: Vec<VoiceEntry>,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            default_voice_id: default_voice_id(),
            entries: default_voice_entries(),
        }
    }
}

/// Main configuration for voice-relay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Streaming core configuration
    #[serde(default)]
    pub stream: StreamConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Voice catalog
    #[serde(default)]
    pub voices: VoicesConfig,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u64 {
    1024
}

fn default_read_timeout_secs() -> u64 {
    60
}

fn default_elevenlabs_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_output_format() -> String {
    "mp3_44100_128".to_string()
}

fn default_fallback_model() -> String {
    "tts-1".to_string()
}

fn default_fallback_voice() -> String {
    "alloy".to_string()
}

fn default_primary_chunk_size() -> usize {
    55
}

fn default_fallback_chunk_size() -> usize {
    100
}

fn default_whisper_model() -> String {
    "whisper-1".to_string()
}

fn default_text_buffer() -> Option<usize> {
    Some(64)
}

fn default_max_queued_inputs() -> usize {
    4
}

fn default_port() -> u16 {
    8000
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_voice_entries() -> Vec<VoiceEntry> {
    vec![
        VoiceEntry {
            key: "1".to_string(),
            id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            name: "Rachel".to_string(),
            description: "Calm and professional female voice".to_string(),
        },
        VoiceEntry {
            key: "2".to_string(),
            id: "AZnzlk1XvdvUeBnXmlld".to_string(),
            name: "Domi".to_string(),
            description: "Strong and confident female voice".to_string(),
        },
        VoiceEntry {
            key: "3".to_string(),
            id: "N2lVS1w4EtoT3dr4eOWO".to_string(),
            name: "Callum".to_string(),
            description: "Deceptively gravelly, yet unsettling edge.".to_string(),
        },
    ]
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                while let Some(c) = chars.next() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 文字列から設定を読み込む (環境変数の上書きなし)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換され、
    /// その後に環境変数による上書きが適用されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env_overrides();
        cfg.resolve_shared_keys();
        cfg.validate()?;

        Ok(cfg)
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./voice-relay.toml` があればそれを使い、なければ環境変数のみ。
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        cfg.resolve_shared_keys();
        cfg.validate()?;
        Ok(cfg)
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_env("OPENAI_API_KEY") {
            if self.llm.provider == LlmProvider::OpenAi && self.llm.api_key.is_empty() {
                self.llm.api_key = key.clone();
            }
            self.speech.openai_api_key = Some(key);
        }
        if let Some(key) = non_empty_env("LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(model) = non_empty_env("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(provider) = non_empty_env("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&provider);
        }
        if let Some(base_url) = non_empty_env("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Some(key) = non_empty_env("ELEVENLABS_API_KEY") {
            self.speech.elevenlabs_api_key = key;
        }
        if let Some(voice_id) = non_empty_env("DEFAULT_VOICE_ID") {
            self.voices.default_voice_id = voice_id;
        }

        if let Some(port) = non_empty_env("VOICE_RELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(origins) = non_empty_env("VOICE_RELAY_ALLOWED_ORIGINS") {
            self.server.allowed_origins = Some(
                origins.split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            );
        }
    }

    /// OpenAI キーを未設定のサブシステムに共有する
    fn resolve_shared_keys(&mut self) {
        if self.speech.openai_api_key.is_none() && self.llm.provider == LlmProvider::OpenAi {
            if !self.llm.api_key.is_empty() {
                self.speech.openai_api_key = Some(self.llm.api_key.clone());
            }
        }
        if self.transcription.api_key.is_none() {
            self.transcription.api_key = self.speech.openai_api_key.clone();
        }
    }

    /// Reject configurations the streaming core cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.llm.api_key.is_empty() {
            return Err(Error::Config(
                "LLM API key not set (LLM_API_KEY or OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.speech.primary_chunk_size == 0 || self.speech.fallback_chunk_size == 0 {
            return Err(Error::Config("chunk sizes must be greater than zero".to_string()));
        }
        if self.stream.synthesis_buffer == Some(0) || self.stream.text_buffer == Some(0) {
            return Err(Error::Config("channel buffers must be greater than zero".to_string()));
        }
        if self.stream.max_queued_inputs == 0 {
            return Err(Error::Config("max_queued_inputs must be greater than zero".to_string()));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_provider_default() {
        assert_eq!(LlmProvider::default(), LlmProvider::OpenAi);
    }

    #[test]
    fn test_llm_provider_parse() {
        assert_eq!(LlmProvider::parse("claude"), LlmProvider::Claude);
        assert_eq!(LlmProvider::parse("Anthropic"), LlmProvider::Claude);
        assert_eq!(LlmProvider::parse("openai"), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::parse("glm"), LlmProvider::OpenAi);
    }

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.provider, LlmProvider::OpenAi);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_speech_config_default() {
        let config = SpeechConfig::default();
        assert_eq!(config.primary_chunk_size, 55);
        assert_eq!(config.fallback_chunk_size, 100);
        assert_eq!(config.elevenlabs_model, "eleven_multilingual_v2");
        assert_eq!(config.fallback_model, "tts-1");
    }

    #[test]
    fn test_stream_and_server_defaults() {
        let stream = StreamConfig::default();
        assert_eq!(stream.max_queued_inputs, 4);
        assert_eq!(stream.synthesis_buffer, None);
        assert_eq!(stream.text_buffer, Some(64));

        let server = ServerConfig::default();
        assert_eq!(server.port, 8000);
        assert!(server.static_dir.is_none());
    }

    #[test]
    fn test_default_voice_catalog() {
        let voices = VoicesConfig::default();
        assert_eq!(voices.entries.len(), 3);
        assert_eq!(voices.default_voice_id, "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(voices.entries[0].name, "Rachel");
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-only variable with a unique name
        unsafe {
            std::env::set_var("VOICE_RELAY_TEST_VAR", "test_value");
        }
        let result = Config::expand_env_vars("prefix_${VOICE_RELAY_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");
        unsafe {
            std::env::remove_var("VOICE_RELAY_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = Config::expand_env_vars("a${VOICE_RELAY_SURELY_UNSET_VAR}b");
        assert_eq!(result, "ab");
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        let result = Config::expand_env_vars("cost: $5");
        assert_eq!(result, "cost: $5");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[llm]
provider = "claude"
model = "claude-sonnet-4-20250514"
api_key = "test_key"

[speech]
elevenlabs_api_key = "el_key"
primary_chunk_size = 40

[stream]
max_queued_inputs = 2
synthesis_buffer = 16

[server]
port = 9000

[voices]
default_voice_id = "voice-x"
entries = [{ key = "1", id = "voice-x", name = "Xavier" }]
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Claude);
        assert_eq!(config.llm.api_key, "test_key");
        assert_eq!(config.speech.elevenlabs_api_key, "el_key");
        assert_eq!(config.speech.primary_chunk_size, 40);
        assert_eq!(config.speech.fallback_chunk_size, 100);
        assert_eq!(config.stream.max_queued_inputs, 2);
        assert_eq!(config.stream.synthesis_buffer, Some(16));
        assert_eq!(config.stream.text_buffer, Some(64));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.voices.entries.len(), 1);
        assert_eq!(config.voices.entries[0].description, "");
    }

    #[test]
    fn test_toml_empty_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.read_timeout_secs, 60);
        assert_eq!(config.voices.entries.len(), 3);
    }

    #[test]
    fn test_validate_requires_llm_key() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.llm.api_key = "key".to_string();
        assert!(config.validate().is_ok());

        config.speech.primary_chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.api_key = "key".to_string();
        config.stream.synthesis_buffer = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_shared_keys() {
        let mut config = Config::default();
        config.llm.api_key = "sk-test".to_string();
        config.resolve_shared_keys();
        assert_eq!(config.speech.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.transcription.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_resolve_shared_keys_claude_provider() {
        let mut config = Config::default();
        config.llm.provider = LlmProvider::Claude;
        config.llm.api_key = "anthropic-key".to_string();
        config.resolve_shared_keys();
        assert!(config.speech.openai_api_key.is_none());
    }
}
