//! vr-ws: Streaming gateway for voice-relay
//!
//! Serves the live conversation socket and the request/response endpoints.
//! Built with axum for HTTP and WebSocket handling.

pub mod api;
pub mod error;
pub mod handler;
pub mod message;
pub mod server;
pub mod session;

pub use error::{Result, WsError};
pub use handler::websocket_handler;
pub use message::{ClientMessage, ServerMessage};
pub use server::{AppState, router, start_server};
pub use session::{SessionOrchestrator, TurnInput, TurnReport, run_turns};
