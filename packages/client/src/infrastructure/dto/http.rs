//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::{Message, MessageId};

/// One element of `GET /api/messages/{room}/?format=json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageDto {
    pub id: MessageId,
    pub text: String,
}

impl From<MessageDto> for Message {
    fn from(dto: MessageDto) -> Self {
        Message {
            id: dto.id,
            text: dto.text,
        }
    }
}
