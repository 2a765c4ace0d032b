//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// Maximum length of a room name in bytes
pub const ROOM_NAME_MAX_LEN: usize = 100;

/// Room name value object.
///
/// A room is addressed by one path segment, both in the navigation path
/// (`/{room}`) and in the server endpoints (`/api/messages/{room}/`,
/// `/ws/{room}/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomName(String);

impl RoomName {
    /// Create a new RoomName.
    ///
    /// # Arguments
    ///
    /// * `name` - The room name string
    ///
    /// # Returns
    ///
    /// A Result containing the RoomName or an error if validation fails
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        if name.is_empty() {
            return Err(ValueObjectError::RoomNameEmpty);
        }
        let len = name.len();
        if len > ROOM_NAME_MAX_LEN {
            return Err(ValueObjectError::RoomNameTooLong {
                max: ROOM_NAME_MAX_LEN,
                actual: len,
            });
        }
        if name.contains('/') {
            return Err(ValueObjectError::RoomNameInvalidSegment(name));
        }
        Ok(Self(name))
    }

    /// Resolve the active room from a navigation path.
    ///
    /// The last non-empty segment wins: `"/lobby/"` and `"lobby"` both
    /// resolve to `lobby`.
    pub fn from_path(path: &str) -> Result<Self, ValueObjectError> {
        let segment = path
            .split('/')
            .rev()
            .find(|s| !s.is_empty())
            .ok_or(ValueObjectError::RoomNameEmpty)?;
        Self::new(segment.to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identifier value object.
///
/// Assigned by the server and opaque to the client. The server may use
/// either JSON numbers or JSON strings; `1` and `"1"` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(serde_json::Number),
    Text(String),
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}
