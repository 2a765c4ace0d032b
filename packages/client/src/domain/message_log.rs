//! Ordered, deduplicated message log.
//!
//! History comes first in server order, then live messages in arrival order.
//! No id appears twice; the first occurrence keeps its position.

use std::{collections::HashSet, sync::Arc};

use super::{entity::Message, error::MessageLogError, value_object::MessageId};

/// Immutable view of the log handed to the presentation layer.
pub type Snapshot = Arc<[Message]>;

/// Pure accumulator for a room's messages.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
    live_appended: usize,
}

impl MessageLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `messages`, dropping repeated ids.
    ///
    /// # Errors
    ///
    /// Returns `MessageLogError::SeedAfterLiveAppend` once any live message
    /// has been appended; the log is left untouched.
    pub fn seed(&mut self, messages: Vec<Message>) -> Result<(), MessageLogError> {
        if self.live_appended > 0 {
            return Err(MessageLogError::SeedAfterLiveAppend {
                appended: self.live_appended,
            });
        }

        self.messages.clear();
        self.ids.clear();
        for message in messages {
            self.push_unique(message);
        }
        Ok(())
    }

    /// Append a live message.
    ///
    /// Returns `false` (and changes nothing) when the id is already present.
    pub fn append(&mut self, message: Message) -> bool {
        let inserted = self.push_unique(message);
        if inserted {
            self.live_appended += 1;
        }
        inserted
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Snapshot {
        Arc::from(self.messages.as_slice())
    }

    /// Whether a message with `id` is present
    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push_unique(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id.clone()) {
            tracing::trace!("Skipping duplicate message id={}", message.id);
            return false;
        }
        self.messages.push(message);
        true
    }
}
