//! voice-relay: main binary
//!
//! Usage:
//!   voice-relay                   - Start the server
//!   voice-relay --config <path>   - Start with an explicit config file
//!   voice-relay --help            - Show help

mod cli;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vr_core::{Config, GenerationSource, LlmClient};
use vr_voice::{SynthesisProviders, TtsClient, TtsConfig, WhisperClient, WhisperConfig};
use vr_ws::AppState;

use crate::cli::{RunMode, ServeArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = cli::parse_args(std::env::args().skip(1))?;

    let serve = match mode {
        RunMode::Help => {
            cli::print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("voice-relay {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Serve(serve) => serve,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = load_config(&serve)?;

    tracing::info!("Starting voice-relay...");
    tracing::info!("LLM: {:?} / {}", config.llm.provider, config.llm.model);

    run_server(config).await
}

fn load_config(serve: &ServeArgs) -> anyhow::Result<Config> {
    let mut config = match &serve.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            Config::from_toml_file(path)
        }
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    if let Some(port) = serve.port {
        config.server.port = port;
    }

    Ok(config)
}

/// Build the providers and serve until Ctrl+C
async fn run_server(config: Config) -> anyhow::Result<()> {
    let generator: Arc<dyn GenerationSource> = Arc::new(
        LlmClient::new(&config.llm)
            .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?,
    );

    if config.speech.elevenlabs_api_key.is_empty() {
        tracing::warn!("ELEVENLABS_API_KEY not set; every chunk will go to the fallback provider");
    }

    let primary = TtsClient::new(TtsConfig::primary(&config.speech))
        .map_err(|e| anyhow::anyhow!("Failed to create primary TTS client: {}", e))?;
    let fallback = TtsClient::new(TtsConfig::fallback(&config.speech))
        .map_err(|e| anyhow::anyhow!("Failed to create fallback TTS client: {}", e))?;
    let providers = SynthesisProviders::new(Arc::new(primary), Arc::new(fallback));

    let transcriber = WhisperClient::new(WhisperConfig::from_config(&config.transcription))
        .map_err(|e| anyhow::anyhow!("Failed to create transcription client: {}", e))?;

    let state = AppState::new(&config, generator, providers, Arc::new(transcriber));

    tracing::info!("Press Ctrl+C to exit");

    vr_ws::start_server(&config.server, state, shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    tracing::info!("Shutting down...");
}
