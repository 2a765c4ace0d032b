//! UseCase: ルームセッションの非同期駆動
//!
//! `RoomSession` を1つのタスクで駆動し、プレゼンテーション層に
//! スナップショット・送信口・activate/deactivate を提供します。
//!
//! ## 前提
//!
//! - 状態の変更は全て駆動タスク内で行われる（単一の論理スレッド）
//! - deactivate 後に完了した履歴取得は破棄される
//! - ハンドルを drop するとセッションは deactivate される

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};

use super::{
    error::SessionError,
    room_session::{RoomSession, SessionEvent, SessionState},
};
use crate::{
    config::ClientConfig,
    domain::{
        ChannelEvent, ChatChannel, ConnectionState, FetchError, HistoryLoader, Message, RoomName,
        Snapshot,
    },
    infrastructure::LiveChannel,
};

type HistoryResult = Result<Vec<Message>, FetchError>;

/// Commands from the presentation layer
#[derive(Debug)]
enum SessionCommand {
    Submit(String),
    Deactivate,
}

/// Handle to a running room session
pub struct SessionHandle {
    room: RoomName,
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<Snapshot>,
    states: watch::Receiver<SessionState>,
    connection: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Activate a session for `room` against the configured server.
    ///
    /// Opens the live channel and starts the history load concurrently;
    /// neither waits for the other.
    pub fn activate(
        config: &ClientConfig,
        room: RoomName,
        loader: Arc<dyn HistoryLoader>,
    ) -> Result<Self, SessionError> {
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        let channel = LiveChannel::open(config, room.clone(), channel_tx)?;
        let connection = channel.subscribe_state();
        Self::spawn(room, channel, channel_rx, connection, loader)
    }

    /// Activate a session over an already opened channel.
    pub fn spawn<C>(
        room: RoomName,
        channel: C,
        channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
        connection: watch::Receiver<ConnectionState>,
        loader: Arc<dyn HistoryLoader>,
    ) -> Result<Self, SessionError>
    where
        C: ChatChannel + 'static,
    {
        let mut session = RoomSession::new(room.clone(), channel);
        session.activate()?;
        let snapshots = session.subscribe();
        let states = session.subscribe_state();

        let (history_tx, history_rx) = oneshot::channel();
        let history_task = tokio::spawn({
            let room = room.clone();
            async move {
                let result = loader.load(&room).await;
                // The session may have been deactivated meanwhile
                let _ = history_tx.send(result);
            }
        });

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(
            session,
            commands_rx,
            channel_events,
            history_rx,
            history_task,
        ));

        Ok(Self {
            room,
            commands: commands_tx,
            snapshots,
            states,
            connection,
            task: Some(task),
        })
    }

    pub fn room(&self) -> &RoomName {
        &self.room
    }

    /// 現在のメッセージ一覧
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// 変更のたびに新しいスナップショットを受け取る
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn session_state(&self) -> SessionState {
        *self.states.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.states.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }

    /// ドラフトを送信する
    ///
    /// ドラフトは送信の成否にかかわらず空になります。送信失敗
    /// （チャンネルが Open でない等）はログに記録されるだけです。
    ///
    /// # Errors
    ///
    /// * `SessionError::AlreadyClosed` - セッションが既に終了している場合
    pub fn submit(&self, draft: &mut String) -> Result<(), SessionError> {
        let text = std::mem::take(draft);
        if text.is_empty() {
            return Ok(());
        }
        self.commands
            .send(SessionCommand::Submit(text))
            .map_err(|_| SessionError::AlreadyClosed(self.room.to_string()))
    }

    /// セッションを終了し、駆動タスクの完了を待つ。冪等。
    pub async fn deactivate(&mut self) {
        let _ = self.commands.send(SessionCommand::Deactivate);
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("Session task for room '{}' failed: {}", self.room, e);
        }
    }
}

/// Drive the state machine until deactivation.
async fn drive<C: ChatChannel>(
    mut session: RoomSession<C>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    mut channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
    mut history: oneshot::Receiver<HistoryResult>,
    history_task: JoinHandle<()>,
) {
    let mut history_pending = true;
    let mut channel_live = true;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Submit(text)) => session.handle(SessionEvent::Submit(text)),
                Some(SessionCommand::Deactivate) | None => break,
            },
            result = &mut history, if history_pending => {
                history_pending = false;
                let result = result.unwrap_or_else(|_| {
                    Err(FetchError::Request("history load ended without a result".to_string()))
                });
                session.handle(SessionEvent::HistoryLoaded(result));
            }
            event = channel_events.recv(), if channel_live => match event {
                Some(event) => session.handle(SessionEvent::Channel(event)),
                None => channel_live = false,
            },
        }
    }

    // A late history response must not reach the closed session
    history_task.abort();
    session.handle(SessionEvent::Deactivate);
}
