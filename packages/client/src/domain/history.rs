//! History loader port.

use async_trait::async_trait;

use super::{entity::Message, error::FetchError, value_object::RoomName};

/// One-shot read of a room's existing messages.
///
/// Implementations have no side effects beyond the request itself and are
/// safe to retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryLoader: Send + Sync {
    /// Load the room history in server order.
    async fn load(&self, room: &RoomName) -> Result<Vec<Message>, FetchError>;
}
