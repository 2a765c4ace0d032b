//! Domain layer for the room client.
//!
//! This module contains the message model, the message log and the ports
//! that the infrastructure layer implements. It performs no I/O.

pub mod channel;
pub mod entity;
pub mod error;
pub mod history;
pub mod message_log;
pub mod value_object;

pub use channel::{ChannelEvent, ChatChannel, ConnectionState};
pub use entity::Message;
pub use error::{ChannelError, ChannelErrorKind, FetchError, MessageLogError, ValueObjectError};
pub use history::HistoryLoader;
pub use message_log::{MessageLog, Snapshot};
pub use value_object::{MessageId, RoomName};

#[cfg(test)]
pub use channel::MockChatChannel;
#[cfg(test)]
pub use history::MockHistoryLoader;
