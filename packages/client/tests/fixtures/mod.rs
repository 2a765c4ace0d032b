//! In-process chat server for integration tests.
//!
//! Serves `GET /api/messages/{room}/` and `/ws/{room}/` on an ephemeral port.
//! Each text frame `{"message": text}` from a client is stored and broadcast
//! to the room as `{"message": {"id": n, "text": text}}`, except for two
//! control texts:
//!
//! - `!malformed` replies to the sender with `{"message": "not-an-object"}`
//! - `!drop` closes the sender's connection

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::{
    net::TcpListener,
    sync::{Mutex, broadcast},
    task::JoinHandle,
};
use tower_http::trace::TraceLayer;
use yoriai_client::config::{ClientConfig, ReconnectPolicy};

pub const MALFORMED_COMMAND: &str = "!malformed";
pub const DROP_COMMAND: &str = "!drop";

/// Upper bound for any wait in the integration tests
pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ClientFrame {
    message: String,
}

struct FixtureState {
    history: Mutex<HashMap<String, Value>>,
    history_delay: Mutex<Duration>,
    history_status: Mutex<Option<StatusCode>>,
    history_requests: AtomicUsize,
    next_id: AtomicI64,
    connections: AtomicUsize,
    active_connections: AtomicUsize,
    received: Mutex<Vec<String>>,
    broadcast: broadcast::Sender<(String, String)>,
}

pub struct TestServer {
    addr: SocketAddr,
    state: Arc<FixtureState>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let (broadcast, _) = broadcast::channel(64);
        let state = Arc::new(FixtureState {
            history: Mutex::new(HashMap::new()),
            history_delay: Mutex::new(Duration::ZERO),
            history_status: Mutex::new(None),
            history_requests: AtomicUsize::new(0),
            next_id: AtomicI64::new(0),
            connections: AtomicUsize::new(0),
            active_connections: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            broadcast,
        });

        let app = Router::new()
            .route("/api/messages/{room}/", get(history_handler))
            .route("/ws/{room}/", get(websocket_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self { addr, state, task }
    }

    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Client configuration pointing at this server with fast reconnects
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.host());
        config.reconnect = ReconnectPolicy {
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
        };
        config
    }

    pub async fn set_history(&self, room: &str, body: Value) {
        self.state
            .history
            .lock()
            .await
            .insert(room.to_string(), body);
    }

    pub async fn set_history_delay(&self, delay: Duration) {
        *self.state.history_delay.lock().await = delay;
    }

    pub async fn fail_history(&self, status: StatusCode) {
        *self.state.history_status.lock().await = Some(status);
    }

    pub fn history_requests(&self) -> usize {
        self.state.history_requests.load(Ordering::SeqCst)
    }

    /// WebSocket connections accepted so far
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// WebSocket connections currently open and subscribed to broadcasts
    pub fn active_connections(&self) -> usize {
        self.state.active_connections.load(Ordering::SeqCst)
    }

    /// Raw text frames received from clients
    pub async fn received(&self) -> Vec<String> {
        self.state.received.lock().await.clone()
    }

    /// Send a raw frame to every connection in `room`
    pub fn push(&self, room: &str, frame: String) {
        let _ = self.state.broadcast.send((room.to_string(), frame));
    }

    /// Send a well-formed message frame to every connection in `room`
    pub fn push_message(&self, room: &str, id: i64, text: &str) {
        self.push(
            room,
            json!({"message": {"id": id, "text": text}}).to_string(),
        );
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Poll `condition` until it holds or `WAIT` elapses.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let result = tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not met within {WAIT:?}");
}

async fn history_handler(
    State(state): State<Arc<FixtureState>>,
    Path(room): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    state.history_requests.fetch_add(1, Ordering::SeqCst);

    let delay = *state.history_delay.lock().await;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = *state.history_status.lock().await {
        return Err(status);
    }

    let body = state
        .history
        .lock()
        .await
        .get(&room)
        .cloned()
        .unwrap_or_else(|| json!([]));
    Ok(Json(body))
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<FixtureState>>,
    Path(room): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, room))
}

async fn handle_socket(socket: WebSocket, state: Arc<FixtureState>, room: String) {
    let (mut sender, mut receiver) = socket.split();
    let mut broadcasts = state.broadcast.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);
    state.active_connections.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    state.received.lock().await.push(text.to_string());
                    let Ok(frame) = serde_json::from_str::<ClientFrame>(text.as_str()) else {
                        continue;
                    };
                    match frame.message.as_str() {
                        MALFORMED_COMMAND => {
                            let reply = json!({"message": "not-an-object"}).to_string();
                            if sender.send(Message::Text(reply.into())).await.is_err() {
                                break;
                            }
                        }
                        DROP_COMMAND => {
                            let _ = sender.send(Message::Close(None)).await;
                            break;
                        }
                        _ => {
                            let id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                            let echo = json!({"message": {"id": id, "text": frame.message}});
                            let _ = state.broadcast.send((room.clone(), echo.to_string()));
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            outbound = broadcasts.recv() => match outbound {
                Ok((target, frame)) if target == room => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    state.active_connections.fetch_sub(1, Ordering::SeqCst);
}
