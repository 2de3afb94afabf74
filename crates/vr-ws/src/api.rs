//! HTTP API handlers
//!
//! Request/response endpoints next to the streaming socket: voice listing,
//! one-shot transcription, chat and speech synthesis.

use axum::{
    Json,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use vr_core::collect_reply;
use vr_voice::is_supported_audio;

use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    /// Catalog key, voice name or voice id
    #[serde(default)]
    pub voice_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Generic API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Handler functions
// ============================================================================

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Voice Agent API is running" }))
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Voice catalog keyed by selector
pub async fn voices(State(state): State<AppState>) -> Json<serde_json::Value> {
    let voices: serde_json::Map<String, serde_json::Value> = state
        .catalog
        .listing()
        .into_iter()
        .map(|(key, info)| (key, serde_json::json!(info)))
        .collect();

    Json(serde_json::json!({ "voices": voices }))
}

/// Transcribe an uploaded `audio` file
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("audio") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !is_supported_audio(&filename) {
            return Err(api_error(StatusCode::BAD_REQUEST, "Unsupported audio format"));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

        debug!("Transcription upload: {} ({} bytes)", filename, data.len());

        return match state.transcriber.transcribe(&data, &filename).await {
            Ok(text) => {
                info!("Transcribed {}: {} chars", filename, text.chars().count());
                Ok(Json(TranscribeResponse { text }))
            }
            Err(e) => {
                error!("Transcription error: {}", e);
                Err(api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Transcription failed: {}", e),
                ))
            }
        };
    }

    Err(api_error(StatusCode::BAD_REQUEST, "Missing audio file"))
}

/// Full, non-streaming chat reply
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    match collect_reply(state.generator.as_ref(), &req.text).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(e) => {
            error!("LLM error: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("LLM error: {}", e),
            ))
        }
    }
}

/// Synthesize the whole text with the primary provider
pub async fn tts(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    let voice_id = state.catalog.resolve(req.voice_id.as_deref());

    match state.providers.primary.synthesize(&req.text, voice_id).await {
        Ok(audio) => Ok((
            [
                (header::CONTENT_TYPE, audio.content_type),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=speech.mp3".to_string(),
                ),
            ],
            audio.audio_data,
        )
            .into_response()),
        Err(e) => {
            error!("TTS error: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("TTS error: {}", e),
            ))
        }
    }
}
