//! Infrastructure layer
//!
//! Implements the domain ports against the chat server: an HTTP history
//! loader and a WebSocket live channel.

pub mod dto;
pub mod history;
pub mod live_channel;

pub use history::HttpHistoryLoader;
pub use live_channel::LiveChannel;
