//! UseCase: ルームセッションの状態機械
//!
//! HistoryLoader と LiveChannel から届くイベントを MessageLog に反映します。
//!
//! ## 順序の規則
//!
//! - 履歴が確定する（取得成功または失敗）まで、live メッセージはバッファされる
//! - 履歴の seed は常にバッファ済み live メッセージの append より先に行われる
//! - Closed になった後のイベントは全て無視される
//!
//! I/O は行わず、イベントを同期的に処理します。非同期の駆動は
//! `session_handle` が担当します。

use tokio::sync::watch;

use super::error::SessionError;
use crate::domain::{
    ChannelErrorKind, ChannelEvent, ChatChannel, ConnectionState, FetchError, Message, MessageLog,
    RoomName, Snapshot,
};

/// Lifecycle of a room session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No room selected yet
    Idle,
    /// History fetch in flight and/or channel connecting
    Loading,
    /// Channel has opened; live updates flow into the log
    Active,
    /// Torn down; every further event is ignored
    Closed,
}

/// Inputs to the session state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The history load completed
    HistoryLoaded(Result<Vec<Message>, FetchError>),
    /// Something happened on the live channel
    Channel(ChannelEvent),
    /// The user submitted a draft
    Submit(String),
    /// The user navigated away
    Deactivate,
}

/// ルームセッション
///
/// 1つのセッションは1つの MessageLog と1つのチャンネルを生存期間中所有します。
pub struct RoomSession<C> {
    room: RoomName,
    channel: C,
    state: SessionState,
    log: MessageLog,
    /// History has loaded or failed
    history_settled: bool,
    /// Live messages received before history settled
    pending_live: Vec<Message>,
    snapshots: watch::Sender<Snapshot>,
    states: watch::Sender<SessionState>,
}

impl<C: ChatChannel> RoomSession<C> {
    /// 新しい RoomSession を Idle 状態で作成
    pub fn new(room: RoomName, channel: C) -> Self {
        let log = MessageLog::new();
        let (snapshots, _) = watch::channel(log.snapshot());
        let (states, _) = watch::channel(SessionState::Idle);
        Self {
            room,
            channel,
            state: SessionState::Idle,
            log,
            history_settled: false,
            pending_live: Vec::new(),
            snapshots,
            states,
        }
    }

    /// Idle から Loading へ遷移する
    ///
    /// 呼び出し側は直後に履歴の取得とチャンネルの接続を開始します。
    ///
    /// # Errors
    ///
    /// * `SessionError::NotIdle` - Idle 以外の状態から呼ばれた場合
    pub fn activate(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::NotIdle(self.state));
        }
        tracing::info!("Activating session for room '{}'", self.room);
        self.transition(SessionState::Loading);
        Ok(())
    }

    /// イベントを1つ処理する
    pub fn handle(&mut self, event: SessionEvent) {
        if let SessionEvent::Deactivate = event {
            return self.deactivate();
        }

        match self.state {
            SessionState::Closed => {
                tracing::debug!(
                    "Ignoring event for closed session '{}': {:?}",
                    self.room,
                    event
                );
                return;
            }
            SessionState::Idle => {
                tracing::debug!(
                    "Ignoring event for idle session '{}': {:?}",
                    self.room,
                    event
                );
                return;
            }
            SessionState::Loading | SessionState::Active => {}
        }

        match event {
            SessionEvent::HistoryLoaded(result) => self.on_history(result),
            SessionEvent::Channel(event) => self.on_channel(event),
            SessionEvent::Submit(text) => self.on_submit(text),
            SessionEvent::Deactivate => self.deactivate(),
        }
    }

    /// セッションを終了する。チャンネルは無条件に close される。
    pub fn deactivate(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        tracing::info!("Deactivating session for room '{}'", self.room);
        self.channel.close();
        self.pending_live.clear();
        self.transition(SessionState::Closed);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn room(&self) -> &RoomName {
        &self.room
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// 現在のメッセージ一覧
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// 変更のたびに新しいスナップショットを受け取る
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.states.subscribe()
    }

    fn on_history(&mut self, result: Result<Vec<Message>, FetchError>) {
        if self.history_settled {
            tracing::warn!(
                "Ignoring repeated history result for room '{}'",
                self.room
            );
            return;
        }

        match result {
            Ok(messages) => {
                tracing::info!(
                    "Seeding room '{}' with {} message(s)",
                    self.room,
                    messages.len()
                );
                if let Err(e) = self.log.seed(messages) {
                    tracing::warn!("Failed to seed room '{}': {}", self.room, e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "History load for room '{}' failed, continuing live-only: {}",
                    self.room,
                    e
                );
            }
        }
        self.history_settled = true;

        let buffered = std::mem::take(&mut self.pending_live);
        if !buffered.is_empty() {
            tracing::debug!(
                "Applying {} buffered live message(s) to room '{}'",
                buffered.len(),
                self.room
            );
        }
        for message in buffered {
            self.log.append(message);
        }
        self.publish();
    }

    fn on_channel(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::StateChanged(ConnectionState::Open) => {
                if self.state == SessionState::Loading {
                    self.transition(SessionState::Active);
                }
            }
            ChannelEvent::StateChanged(state) => {
                tracing::debug!("Channel for room '{}' is {}", self.room, state);
            }
            ChannelEvent::Message(message) => {
                if !self.history_settled {
                    self.pending_live.push(message);
                    return;
                }
                if self.log.append(message) {
                    self.publish();
                }
            }
            ChannelEvent::Error(ChannelErrorKind::MalformedFrame(reason)) => {
                tracing::debug!("Room '{}' skipped a malformed frame: {}", self.room, reason);
            }
            ChannelEvent::Error(ChannelErrorKind::Transport(reason)) => {
                tracing::debug!("Room '{}' transport error: {}", self.room, reason);
            }
        }
    }

    fn on_submit(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        match self.channel.send(&text) {
            Ok(()) => tracing::debug!("Sent message to room '{}'", self.room),
            Err(e) => tracing::warn!("Dropping message for room '{}': {}", self.room, e),
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("Session '{}': {:?} -> {:?}", self.room, self.state, next);
        self.state = next;
        self.states.send_replace(next);
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.log.snapshot());
    }
}
