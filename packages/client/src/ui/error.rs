//! Presentation layer error definitions.

use thiserror::Error;

use crate::{domain::ValueObjectError, usecase::SessionError};

/// Errors that end the terminal client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid room: {0}")]
    Room(#[from] ValueObjectError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] rustyline::error::ReadlineError),
}
