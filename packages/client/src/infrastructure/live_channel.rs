//! WebSocket live channel.
//!
//! One `LiveChannel` is bound to one room for its whole lifetime. A single
//! worker task owns the transport: it connects, pumps frames in both
//! directions and reconnects after every unexpected close until `close()`
//! is called.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{Mutex, mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{WebSocketStream, connect_async, tungstenite::Message as WsMessage};

use super::dto::websocket::{decode_inbound, encode_outbound};
use crate::{
    config::{ClientConfig, ConfigError, ReconnectPolicy},
    domain::{ChannelError, ChannelErrorKind, ChannelEvent, ChatChannel, ConnectionState, RoomName},
};

/// A connection that stays open this long resets the reconnect backoff
const STABLE_CONNECTION: Duration = Duration::from_secs(5);

/// Handle to a room-scoped WebSocket connection
pub struct LiveChannel {
    room: RoomName,
    outbound: mpsc::UnboundedSender<String>,
    state: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    closed: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveChannel {
    /// Start connecting to the room's live endpoint.
    ///
    /// Returns immediately; the connection is established on a spawned task
    /// and every transition is reported on `events`. Must be called from
    /// within a Tokio runtime.
    pub fn open(
        config: &ClientConfig,
        room: RoomName,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<Self, ConfigError> {
        let url = config.websocket_url(&room)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = ConnectionWorker {
            url: url.to_string(),
            room: room.clone(),
            policy: config.reconnect.clone(),
            events,
            state: state_tx,
            outbound: outbound_rx,
            shutdown: shutdown_rx,
            consecutive_failures: 0,
        };
        tracing::info!("Opening live channel for room '{}' at {}", room, url);
        let task = tokio::spawn(worker.run());

        Ok(Self {
            room,
            outbound: outbound_tx,
            state: state_rx,
            shutdown: shutdown_tx,
            closed: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
        })
    }

    /// Room this channel is bound to
    pub fn room(&self) -> &RoomName {
        &self.room
    }

    /// Watch the connection state
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Close the channel and wait until the transport has been released.
    pub async fn shutdown(&self) {
        self.close();
        let task = self.task.lock().await.take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::warn!("Live channel task for room '{}' failed: {}", self.room, e);
        }
    }
}

impl ChatChannel for LiveChannel {
    fn send(&self, text: &str) -> Result<(), ChannelError> {
        if text.is_empty() {
            return Err(ChannelError::EmptyMessage);
        }
        if self.closed.load(Ordering::Acquire) || *self.state.borrow() != ConnectionState::Open {
            return Err(ChannelError::NotOpen);
        }

        let frame = encode_outbound(text).map_err(|e| ChannelError::Encode(e.to_string()))?;
        self.outbound.send(frame).map_err(|_| ChannelError::NotOpen)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("Closing live channel for room '{}'", self.room);
        // No receiver means the worker already exited
        let _ = self.shutdown.send(true);
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Why a single connection ended
#[derive(Debug)]
enum ConnectionEnd {
    /// `close()` was called
    Shutdown,
    /// The remote closed or the transport failed
    Dropped(String),
}

/// Owns the transport for one channel
struct ConnectionWorker {
    url: String,
    room: RoomName,
    policy: ReconnectPolicy,
    events: mpsc::UnboundedSender<ChannelEvent>,
    state: watch::Sender<ConnectionState>,
    outbound: mpsc::UnboundedReceiver<String>,
    shutdown: watch::Receiver<bool>,
    consecutive_failures: u32,
}

impl ConnectionWorker {
    async fn run(mut self) {
        emit(&self.events, ChannelEvent::StateChanged(ConnectionState::Connecting));

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            self.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                biased;
                _ = wait_shutdown(&mut self.shutdown) => break,
                result = connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((stream, _response)) => {
                    let opened_at = Instant::now();
                    self.discard_stale_outbound();
                    self.set_state(ConnectionState::Open);
                    tracing::info!("Live channel for room '{}' is open", self.room);

                    match self.pump(stream).await {
                        ConnectionEnd::Shutdown => break,
                        ConnectionEnd::Dropped(reason) => {
                            tracing::warn!(
                                "Live channel for room '{}' dropped: {}",
                                self.room,
                                reason
                            );
                            emit(
                                &self.events,
                                ChannelEvent::Error(ChannelErrorKind::Transport(reason)),
                            );
                            if opened_at.elapsed() >= STABLE_CONNECTION {
                                self.consecutive_failures = 0;
                            } else {
                                self.consecutive_failures =
                                    self.consecutive_failures.saturating_add(1);
                            }
                        }
                    }
                }
                Err(e) => {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                    tracing::warn!(
                        "Failed to connect live channel for room '{}' (attempt {}): {}",
                        self.room,
                        self.consecutive_failures,
                        e
                    );
                    emit(
                        &self.events,
                        ChannelEvent::Error(ChannelErrorKind::Transport(e.to_string())),
                    );
                }
            }

            self.set_state(ConnectionState::Closed);

            let delay = self.policy.delay_for(self.consecutive_failures);
            if !delay.is_zero() {
                tracing::debug!(
                    "Reconnecting room '{}' in {} ms",
                    self.room,
                    delay.as_millis()
                );
                tokio::select! {
                    biased;
                    _ = wait_shutdown(&mut self.shutdown) => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        self.set_state(ConnectionState::Closed);
        tracing::info!("Live channel for room '{}' closed", self.room);
    }

    /// Pump frames until the connection ends. The stream is dropped on return.
    async fn pump<S>(&mut self, stream: WebSocketStream<S>) -> ConnectionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                biased;
                _ = wait_shutdown(&mut self.shutdown) => {
                    if let Err(e) = write.close().await {
                        tracing::debug!("Error while closing room '{}': {}", self.room, e);
                    }
                    return ConnectionEnd::Shutdown;
                }
                outbound = self.outbound.recv() => match outbound {
                    Some(frame) => {
                        tracing::trace!("Sending frame to room '{}': {}", self.room, frame);
                        if let Err(e) = write.send(WsMessage::Text(frame.into())).await {
                            return ConnectionEnd::Dropped(e.to_string());
                        }
                    }
                    None => {
                        // Every channel handle is gone
                        let _ = write.close().await;
                        return ConnectionEnd::Shutdown;
                    }
                },
                inbound = read.next() => match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_text(&self.events, &self.room, text.as_str());
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        tracing::warn!(
                            "Discarding binary frame ({} bytes) in room '{}'",
                            bytes.len(),
                            self.room
                        );
                        emit(
                            &self.events,
                            ChannelEvent::Error(ChannelErrorKind::MalformedFrame(format!(
                                "unexpected binary frame ({} bytes)",
                                bytes.len()
                            ))),
                        );
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let reason = match frame {
                            Some(frame) => format!(
                                "closed by server ({}): {}",
                                u16::from(frame.code),
                                frame.reason.as_str()
                            ),
                            None => "closed by server".to_string(),
                        };
                        return ConnectionEnd::Dropped(reason);
                    }
                    Some(Ok(_)) => {
                        // Ping/pong is handled by the WebSocket protocol
                    }
                    Some(Err(e)) => return ConnectionEnd::Dropped(e.to_string()),
                    None => return ConnectionEnd::Dropped("stream ended".to_string()),
                },
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::debug!("Live channel for room '{}' -> {}", self.room, next);
            emit(&self.events, ChannelEvent::StateChanged(next));
        }
    }

    /// Text queued while no connection was open is dropped, not replayed
    fn discard_stale_outbound(&mut self) {
        while let Ok(frame) = self.outbound.try_recv() {
            tracing::debug!("Discarding stale outbound frame for room '{}': {}", self.room, frame);
        }
    }
}

fn handle_text(events: &mpsc::UnboundedSender<ChannelEvent>, room: &RoomName, text: &str) {
    match decode_inbound(text) {
        Ok(message) => {
            tracing::debug!("Received message id={} in room '{}'", message.id, room);
            emit(events, ChannelEvent::Message(message));
        }
        Err(e) => {
            tracing::warn!("Discarding malformed frame in room '{}': {}", room, e);
            emit(
                events,
                ChannelEvent::Error(ChannelErrorKind::MalformedFrame(e.to_string())),
            );
        }
    }
}

fn emit(events: &mpsc::UnboundedSender<ChannelEvent>, event: ChannelEvent) {
    // The session may already be gone; the worker stops on close()
    let _ = events.send(event);
}

/// Resolves once shutdown was requested or every handle was dropped
async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> ClientConfig {
        let mut config = ClientConfig::new("127.0.0.1:1");
        config.reconnect = ReconnectPolicy {
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(50),
            multiplier: 2.0,
        };
        config
    }

    fn room() -> RoomName {
        RoomName::new("lobby".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_open_starts_connecting() {
        // テスト項目: open 直後は Connecting 状態で、その旨のイベントが届く
        // given (前提条件):
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when (操作):
        let channel = LiveChannel::open(&unreachable_config(), room(), tx).unwrap();

        // then (期待する結果):
        assert_eq!(
            rx.recv().await,
            Some(ChannelEvent::StateChanged(ConnectionState::Connecting))
        );
        assert_eq!(channel.room().as_str(), "lobby");
        channel.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_while_not_open_fails() {
        // テスト項目: Open でない場合の送信は NotOpen エラー
        // given (前提条件):
        let (tx, _rx) = mpsc::unbounded_channel();
        let channel = LiveChannel::open(&unreachable_config(), room(), tx).unwrap();

        // when (操作):
        let result = channel.send("hello");

        // then (期待する結果):
        assert_eq!(result, Err(ChannelError::NotOpen));
        channel.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_empty_fails() {
        // テスト項目: 空文字列は送信されない
        let (tx, _rx) = mpsc::unbounded_channel();
        let channel = LiveChannel::open(&unreachable_config(), room(), tx).unwrap();

        assert_eq!(channel.send(""), Err(ChannelError::EmptyMessage));
        channel.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported_and_retried() {
        // テスト項目: 接続失敗は Transport エラーとして通知され、再試行される
        // given (前提条件):
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = LiveChannel::open(&unreachable_config(), room(), tx).unwrap();

        // when (操作): 2回分の接続失敗を待つ
        let mut failures = 0;
        while failures < 2 {
            match rx.recv().await {
                Some(ChannelEvent::Error(ChannelErrorKind::Transport(_))) => failures += 1,
                Some(_) => {}
                None => break,
            }
        }

        // then (期待する結果):
        assert_eq!(failures, 2);
        channel.shutdown().await;
        assert_eq!(channel.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        // テスト項目: close を複数回呼んでも安全で、shutdown 後は Closed
        // given (前提条件):
        let (tx, _rx) = mpsc::unbounded_channel();
        let channel = LiveChannel::open(&unreachable_config(), room(), tx).unwrap();

        // when (操作):
        channel.close();
        channel.close();
        channel.shutdown().await;
        channel.shutdown().await;

        // then (期待する結果):
        assert_eq!(channel.state(), ConnectionState::Closed);
        assert_eq!(channel.send("hello"), Err(ChannelError::NotOpen));
    }
}
