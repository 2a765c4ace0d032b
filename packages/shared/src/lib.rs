//! Shared utilities for Yoriai binaries and tests.

pub mod logger;
pub mod time;

pub use logger::setup_logger;
