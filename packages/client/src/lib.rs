//! Realtime chat room client library.
//!
//! Loads a room's message history once, keeps a live WebSocket channel to
//! the room open, and reconciles both into one ordered, deduplicated log.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ClientConfig;
pub use ui::run_client;
pub use usecase::SessionHandle;
