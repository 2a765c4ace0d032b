//! Client configuration: server endpoints and reconnect policy.

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::domain::RoomName;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1:8000";

/// Lower bound for the delay after a failed connect
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Errors related to configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The host could not form a URL
    #[error("Invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },
}

/// Backoff applied between reconnect attempts.
///
/// Retries never stop on their own. The first attempt after an open
/// connection drops is immediate; each consecutive failed attempt multiplies
/// the delay, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the next attempt after `consecutive_failures` failed connects
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = consecutive_failures.saturating_sub(1).min(64) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay.max(MIN_RETRY_DELAY);
        }
        Duration::from_secs_f64(secs).max(MIN_RETRY_DELAY)
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// `host[:port]` of the chat server
    pub host: String,
    /// Use `https`/`wss` instead of `http`/`ws`
    pub secure: bool,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

impl ClientConfig {
    /// Create a plain-text configuration for `host` with the default reconnect policy
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            secure: false,
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// `GET` endpoint for a room's history
    pub fn history_url(&self, room: &RoomName) -> Result<Url, ConfigError> {
        let scheme = if self.secure { "https" } else { "http" };
        let mut url = self.endpoint(scheme, &["api", "messages", room.as_str()])?;
        url.set_query(Some("format=json"));
        Ok(url)
    }

    /// Live channel endpoint for a room
    pub fn websocket_url(&self, room: &RoomName) -> Result<Url, ConfigError> {
        let scheme = if self.secure { "wss" } else { "ws" };
        self.endpoint(scheme, &["ws", room.as_str()])
    }

    fn endpoint(&self, scheme: &str, segments: &[&str]) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidHost {
            host: self.host.clone(),
            reason,
        };

        let mut url = Url::parse(&format!("{scheme}://{}/", self.host))
            .map_err(|e| invalid(e.to_string()))?;
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }

        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base URL".to_string()))?
            .clear()
            .extend(segments)
            .push("");
        Ok(url)
    }
}
