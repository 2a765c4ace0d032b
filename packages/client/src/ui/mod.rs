//! Terminal presentation layer.
//!
//! Consumes only the session's presentation boundary: snapshots, the submit
//! entry point and activation/deactivation.

pub mod args;
pub mod error;
pub mod render;
mod runner;

pub use args::Args;
pub use error::ClientError;
pub use runner::run as run_client;
