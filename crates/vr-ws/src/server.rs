//! HTTP / WebSocket server implementation
//!
//! Builds the axum router and runs it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, StatusCode},
    routing::{get, get_service, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use vr_core::{Config, GenerationSource, ServerConfig, StreamConfig};
use vr_voice::{ChunkSizes, SynthesisProviders, Transcriber, VoiceCatalog};

use crate::Result;
use crate::api;
use crate::handler::websocket_handler;
use crate::session::SessionOrchestrator;

/// Shared server state; every collaborator is injected here
#[derive(Clone)]
pub struct AppState {
    /// Text generation provider
    pub generator: Arc<dyn GenerationSource>,
    /// Primary and fallback synthesis providers
    pub providers: SynthesisProviders,
    /// Speech recognition provider
    pub transcriber: Arc<dyn Transcriber>,
    /// Voice catalog
    pub catalog: Arc<VoiceCatalog>,
    /// Chunk thresholds per provider
    pub sizes: ChunkSizes,
    /// Channel and queue sizing
    pub stream: StreamConfig,
}

impl AppState {
    pub fn new(
        config: &Config,
        generator: Arc<dyn GenerationSource>,
        providers: SynthesisProviders,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            generator,
            providers,
            transcriber,
            catalog: Arc::new(VoiceCatalog::new(&config.voices)),
            sizes: ChunkSizes {
                primary: config.speech.primary_chunk_size,
                fallback: config.speech.fallback_chunk_size,
            },
            stream: config.stream.clone(),
        }
    }

    /// Turn coordinator for one connection
    pub fn orchestrator(&self, session_id: &str) -> SessionOrchestrator {
        SessionOrchestrator::new(
            session_id,
            self.generator.clone(),
            self.providers.clone(),
            self.catalog.clone(),
            self.sizes,
            self.stream.clone(),
        )
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match &server.allowed_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(origins))
        }
        None => layer.allow_origin(Any),
    }
}

/// Build the application router
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health))
        .route("/voices", get(api::voices))
        .route("/transcribe", post(api::transcribe))
        .route("/chat", post(api::chat))
        .route("/tts", post(api::tts))
        .route("/stream", get(websocket_handler))
        .route("/ws", get(websocket_handler));

    if let Some(dir) = &server.static_dir {
        info!("Serving static files from: {}", dir);
        let serve_dir = get_service(ServeDir::new(dir)).handle_error(|e| async move {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", e),
            )
        });
        router = router.fallback_service(serve_dir);
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(server))
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves
pub async fn start_server<F>(server: &ServerConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, server);

    let addr = SocketAddr::from(([0, 0, 0, 0], server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Streaming endpoint: ws://localhost:{}/stream", server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
