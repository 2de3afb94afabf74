//! Command line arguments
//!
//! `voice-relay [--config <path>] [--port <n>] [--help] [--version]`

use std::path::PathBuf;

use thiserror::Error;

/// Argument parsing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Unknown argument: {0}")]
    Unknown(String),
}

/// Run mode
#[derive(Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Start the server
    Serve(ServeArgs),
    /// Show help
    Help,
    /// Show version
    Version,
}

/// Overrides for server mode
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ServeArgs {
    /// Explicit config file; otherwise `voice-relay.toml` or the environment
    pub config: Option<PathBuf>,
    /// Port override, applied after the config file and environment
    pub port: Option<u16>,
}

/// Parse arguments (without the program name)
pub fn parse_args<I, S>(args: I) -> Result<RunMode, ArgsError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut serve = ServeArgs::default();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args.next().ok_or(ArgsError::MissingValue("--config"))?;
                serve.config = Some(PathBuf::from(path));
            }
            "--port" | "-p" => {
                let port = args.next().ok_or(ArgsError::MissingValue("--port"))?;
                let port = port.parse().map_err(|_| ArgsError::InvalidPort(port))?;
                serve.port = Some(port);
            }
            _ => return Err(ArgsError::Unknown(arg)),
        }
    }

    Ok(RunMode::Serve(serve))
}

/// Print help message
pub fn print_help() {
    println!("voice-relay - streaming voice conversation relay");
    println!();
    println!("Usage:");
    println!("  voice-relay                   Start the server");
    println!("  voice-relay --config <path>   Load configuration from a TOML file");
    println!("  voice-relay --port <n>        Override the listening port");
    println!("  voice-relay --help            Show this help message");
    println!("  voice-relay --version         Show version");
    println!();
    println!("Environment Variables:");
    println!("  OPENAI_API_KEY       OpenAI key (LLM, fallback speech, transcription)");
    println!("  ELEVENLABS_API_KEY   ElevenLabs key (primary speech)");
    println!("  LLM_API_KEY          LLM API key (overrides OPENAI_API_KEY for the LLM)");
    println!("  LLM_MODEL            Model name (default: gpt-4o-mini)");
    println!("  LLM_PROVIDER         Provider: openai or claude (default: openai)");
    println!("  LLM_BASE_URL         Custom API endpoint");
    println!("  DEFAULT_VOICE_ID     Voice used when a request names none");
    println!("  VOICE_RELAY_PORT     HTTP port (default: 8000)");
    println!("  RUST_LOG             Log filter (default: info)");
}
