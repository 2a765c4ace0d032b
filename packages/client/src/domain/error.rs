//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// RoomName validation error
    #[error("RoomName cannot be empty")]
    RoomNameEmpty,

    /// RoomName too long error
    #[error("RoomName cannot exceed {max} characters (got {actual})")]
    RoomNameTooLong { max: usize, actual: usize },

    /// RoomName contains a path separator
    #[error("RoomName must be a single path segment (got: {0})")]
    RoomNameInvalidSegment(String),
}

/// Errors related to MessageLog bookkeeping
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageLogError {
    /// History arrived after live messages were already appended
    #[error("Cannot seed message log after {appended} live message(s) were appended")]
    SeedAfterLiveAppend { appended: usize },
}

/// Errors produced by a history load
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or the connection failed
    #[error("History request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status
    #[error("History request returned status {0}")]
    Status(u16),

    /// The response body was not a list of messages
    #[error("History response could not be decoded: {0}")]
    Decode(String),
}

/// Errors returned synchronously by a channel send
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel is not in the `Open` state
    #[error("Channel is not open")]
    NotOpen,

    /// Empty text never produces a frame
    #[error("Cannot send an empty message")]
    EmptyMessage,

    /// The outbound frame could not be serialized
    #[error("Failed to encode outbound frame: {0}")]
    Encode(String),
}

/// Non-fatal failures reported as channel events
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelErrorKind {
    /// An inbound frame did not decode as `{"message": {"id": .., "text": ..}}`
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// The connection failed or dropped; a reconnect follows
    #[error("Transport error: {0}")]
    Transport(String),
}
