//! WebSocket connection handler
//!
//! One connection runs three loops: outbound event writer, inbound message
//! reader, and the turn loop. Text inputs that arrive during an active turn
//! wait in a bounded queue; when it is full the input is rejected with an
//! `error` event. Whichever loop ends first ends the connection, which drops
//! the active turn and cancels its workers.

use axum::{
    extract::{
        State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use vr_core::EventSender;

use crate::message::{ClientMessage, ServerMessage};
use crate::server::AppState;
use crate::session::{TurnInput, run_turns};

/// Handle WebSocket upgrade request
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle established WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!("New WebSocket connection: {}", session_id);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (events, mut event_rx) = EventSender::channel();

    let init_msg = ServerMessage::SessionInfo {
        session_id: session_id.clone(),
        connected_at: chrono::Utc::now().to_rfc3339(),
    };
    if events.send(init_msg).is_err() {
        return;
    }

    let queue_size = state.stream.max_queued_inputs.max(1);
    let (input_tx, input_rx) = mpsc::channel::<TurnInput>(queue_size);
    let orchestrator = state.orchestrator(&session_id);

    let session_id_send = session_id.clone();
    let send_task = async move {
        while let Some(msg) = event_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
        debug!("Send task ended for session: {}", session_id_send);
    };

    let session_id_recv = session_id.clone();
    let recv_events = events.clone();
    let recv_task = async move {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(WsMessage::Text(text)) => {
                    if handle_client_message(&text, &input_tx, &recv_events).is_err() {
                        break;
                    }
                }
                Ok(WsMessage::Close(_)) => {
                    info!("Client closed connection: {}", session_id_recv);
                    break;
                }
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        debug!("Receive task ended for session: {}", session_id_recv);
    };

    let turn_task = run_turns(orchestrator, input_rx, events);

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
        _ = turn_task => {},
    }

    info!("WebSocket connection closed: {}", session_id);
}

/// Handle incoming client message
///
/// Returns an error only when the client's event channel is gone.
fn handle_client_message(
    text: &str,
    inputs: &mpsc::Sender<TurnInput>,
    events: &EventSender,
) -> Result<(), vr_core::TransportClosed> {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("Invalid client message: {}", e);
            return events.send(ServerMessage::error(format!("Invalid message: {}", e)));
        }
    };

    match msg {
        ClientMessage::TextInput { text, voice_id } => {
            if text.trim().is_empty() {
                return events.send(ServerMessage::error("Text input is empty"));
            }

            match inputs.try_send(TurnInput::new(text, voice_id)) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    warn!("Input queue full, rejecting text input");
                    events.send(ServerMessage::error(
                        "Too many pending inputs; wait for the current response to finish",
                    ))
                }
                Err(TrySendError::Closed(_)) => Err(vr_core::TransportClosed),
            }
        }
        ClientMessage::Ping => events.send(ServerMessage::Pong),
    }
}
