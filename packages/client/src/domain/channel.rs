//! Live channel port.
//!
//! The domain defines what a live connection must offer; the
//! WebSocket implementation lives in the infrastructure layer.

use std::fmt;

use super::{
    entity::Message,
    error::{ChannelError, ChannelErrorKind},
};

/// Connection state of a live channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Events emitted by a live channel, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The connection moved to a new state
    StateChanged(ConnectionState),
    /// A decoded inbound message
    Message(Message),
    /// A non-fatal failure; the channel keeps running
    Error(ChannelErrorKind),
}

/// Outbound side of a room-scoped live connection.
#[cfg_attr(test, mockall::automock)]
pub trait ChatChannel: Send + Sync {
    /// Transmit `text` as one frame without waiting for acknowledgement.
    ///
    /// # Errors
    ///
    /// * `ChannelError::NotOpen` if the connection is not `Open`
    /// * `ChannelError::EmptyMessage` if `text` is empty
    fn send(&self, text: &str) -> Result<(), ChannelError>;

    /// Release the connection and stop reconnecting. Idempotent.
    fn close(&self);

    /// Current connection state
    fn state(&self) -> ConnectionState;
}
