//! Data transfer objects for the server interfaces.

pub mod http;
pub mod websocket;
