//! Rendering of message snapshots.

use crate::domain::{ConnectionState, Message};

/// Tracks how much of the log has already been printed
#[derive(Debug, Default)]
pub struct Renderer {
    printed: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines for the part of `snapshot` not printed yet.
    ///
    /// The log only grows once live messages flow; if it is ever shorter
    /// than what was printed, everything is printed again.
    pub fn pending_lines(&mut self, snapshot: &[Message]) -> Vec<String> {
        if snapshot.len() < self.printed {
            self.printed = 0;
        }
        let lines = snapshot[self.printed..]
            .iter()
            .map(format_message)
            .collect();
        self.printed = snapshot.len();
        lines
    }
}

pub fn format_message(message: &Message) -> String {
    format!("#{} {}", message.id, message.text)
}

pub fn format_connection(state: ConnectionState) -> String {
    format!("-- {state} --")
}
