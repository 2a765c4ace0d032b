//! WebSocket frame DTOs.
//!
//! Outbound: `{"message": "<text>"}`
//! Inbound: `{"message": {"id": .., "text": ..}}`

use serde::{Deserialize, Serialize};

use super::http::MessageDto;
use crate::domain::Message;

/// Frame sent from the client to the server
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutboundFrame<'a> {
    pub message: &'a str,
}

/// Frame sent from the server to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundFrame {
    pub message: MessageDto,
}

/// Serialize outbound text.
pub fn encode_outbound(text: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutboundFrame { message: text })
}

/// Decode an inbound text frame into a message.
pub fn decode_inbound(frame: &str) -> Result<Message, serde_json::Error> {
    let inbound: InboundFrame = serde_json::from_str(frame)?;
    Ok(inbound.message.into())
}
