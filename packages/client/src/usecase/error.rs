//! UseCase layer error definitions.

use thiserror::Error;

use super::room_session::SessionState;
use crate::config::ConfigError;

/// Errors related to room session lifecycle
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Endpoint configuration was invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Only an idle session can be activated
    #[error("Session cannot be activated from state {0:?}")]
    NotIdle(SessionState),

    /// The session was deactivated
    #[error("Session for room '{0}' is already closed")]
    AlreadyClosed(String),
}
