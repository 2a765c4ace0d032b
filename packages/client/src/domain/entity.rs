//! Core domain models for the room client.

use serde::{Deserialize, Serialize};

use super::value_object::MessageId;

/// A chat message as shown to the user.
///
/// Identity is by `id`: two messages with the same `id` are the same message,
/// whatever their text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned identifier
    pub id: MessageId,
    /// Message body
    pub text: String,
}

impl Message {
    /// Create a new message
    pub fn new(id: impl Into<MessageId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}
