//! End-to-end streaming over a real socket

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use vr_core::{Config, FragmentStream, GenerationSource, ServerConfig};
use vr_voice::{
    AudioPayload, ProviderChoice, SynthesisError, SynthesisProvider, SynthesisProviders, Transcriber,
};
use vr_ws::{AppState, ServerMessage, router};

struct HelloSource;

#[async_trait]
impl GenerationSource for HelloSource {
    async fn generate(&self, _prompt: &str) -> vr_core::Result<FragmentStream> {
        let items = ["Hel", "lo wor", "ld."].map(|f| Ok::<_, vr_core::Error>(f.to_string()));
        Ok(futures::stream::iter(items)
            .then(|item| async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                item
            })
            .boxed())
    }
}

struct Speaker {
    choice: ProviderChoice,
    failing: bool,
}

#[async_trait]
impl SynthesisProvider for Speaker {
    fn name(&self) -> &str {
        "speaker"
    }

    fn choice(&self) -> ProviderChoice {
        self.choice
    }

    async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<AudioPayload, SynthesisError> {
        if self.failing {
            return Err(SynthesisError::new(self.choice, "quota exceeded"));
        }
        Ok(AudioPayload {
            audio_data: text.as_bytes().to_vec(),
            content_type: "audio/mpeg".to_string(),
            text: text.to_string(),
            provider: self.choice,
        })
    }
}

struct NoTranscriber;

#[async_trait]
impl Transcriber for NoTranscriber {
    async fn transcribe(&self, _audio_data: &[u8], _filename: &str) -> vr_voice::Result<String> {
        Ok(String::new())
    }
}

async fn spawn_server(primary_failing: bool) -> SocketAddr {
    let mut config = Config::default();
    config.speech.primary_chunk_size = 6;
    config.speech.fallback_chunk_size = 6;

    let state = AppState::new(
        &config,
        Arc::new(HelloSource),
        SynthesisProviders::new(
            Arc::new(Speaker {
                choice: ProviderChoice::Primary,
                failing: primary_failing,
            }),
            Arc::new(Speaker {
                choice: ProviderChoice::Fallback,
                failing: false,
            }),
        ),
        Arc::new(NoTranscriber),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state, &ServerConfig::default());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn next_event(socket: &mut Socket) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for event")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Collect events up to and including `stream_complete`
async fn collect_turn(socket: &mut Socket) -> Vec<ServerMessage> {
    let mut events = Vec::new();
    loop {
        let event = next_event(socket).await;
        let done = event.is_terminal();
        events.push(event);
        if done {
            return events;
        }
    }
}

async fn connect(addr: SocketAddr, path: &str) -> Socket {
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}{}", addr, path))
        .await
        .unwrap();

    match next_event(&mut socket).await {
        ServerMessage::SessionInfo { session_id, .. } => assert!(!session_id.is_empty()),
        other => panic!("expected session_info, got {:?}", other),
    }
    socket
}

async fn send_text(socket: &mut Socket, text: &str) {
    let payload = serde_json::json!({ "type": "text_input", "text": text });
    socket
        .send(Message::Text(payload.to_string().into()))
        .await
        .unwrap();
}

fn texts(events: &[ServerMessage]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerMessage::TextChunk { content } => Some(content.clone()),
            _ => None,
        })
        .collect()
}

fn audio(events: &[ServerMessage]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerMessage::AudioChunk { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_say_hello_over_socket() {
    let addr = spawn_server(false).await;
    let mut socket = connect(addr, "/stream").await;

    send_text(&mut socket, "Say hello").await;
    let events = collect_turn(&mut socket).await;

    assert_eq!(texts(&events), vec!["Hel", "lo wor", "ld."]);
    assert_eq!(audio(&events), vec!["Hello wor", "ld."]);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(!events.iter().any(|e| matches!(e, ServerMessage::Error { .. })));
}

#[tokio::test]
async fn test_primary_failure_over_socket() {
    let addr = spawn_server(true).await;
    let mut socket = connect(addr, "/ws").await;

    send_text(&mut socket, "Say hello").await;
    let events = collect_turn(&mut socket).await;

    let errors: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ServerMessage::Error { message } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Primary"));
    assert_eq!(audio(&events), vec!["Hello wor", "ld."]);
    assert_eq!(events.last(), Some(&ServerMessage::StreamComplete));
}

#[tokio::test]
async fn test_inputs_during_turn_are_queued() {
    let addr = spawn_server(false).await;
    let mut socket = connect(addr, "/stream").await;

    send_text(&mut socket, "first").await;
    send_text(&mut socket, "second").await;

    let first = collect_turn(&mut socket).await;
    let second = collect_turn(&mut socket).await;

    assert_eq!(texts(&first), vec!["Hel", "lo wor", "ld."]);
    assert_eq!(texts(&second), vec!["Hel", "lo wor", "ld."]);
}

#[tokio::test]
async fn test_ping_pong() {
    let addr = spawn_server(false).await;
    let mut socket = connect(addr, "/stream").await;

    socket
        .send(Message::Text(r#"{"type":"ping"}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_event(&mut socket).await, ServerMessage::Pong);
}
