//! HTTP history loader.
//!
//! Implements the domain `HistoryLoader` port with a single `GET` request.

use async_trait::async_trait;

use super::dto::http::MessageDto;
use crate::{
    config::ClientConfig,
    domain::{FetchError, HistoryLoader, Message, RoomName},
};

/// History loader backed by `GET /api/messages/{room}/?format=json`
#[derive(Debug, Clone)]
pub struct HttpHistoryLoader {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpHistoryLoader {
    /// Create a loader with a fresh HTTP client
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a loader that shares an existing HTTP client
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl HistoryLoader for HttpHistoryLoader {
    async fn load(&self, room: &RoomName) -> Result<Vec<Message>, FetchError> {
        let url = self
            .config
            .history_url(room)
            .map_err(|e| FetchError::Request(e.to_string()))?;
        tracing::debug!("Loading history for room '{}' from {}", room, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let dtos: Vec<MessageDto> = response.json().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Decode(e.to_string())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        tracing::info!("Loaded {} message(s) for room '{}'", dtos.len(), room);
        Ok(dtos.into_iter().map(Message::from).collect())
    }
}
