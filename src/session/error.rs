use thiserror::Error;

use crate::chat::ChatError;

/// Failures a client command can cause.  Engine failures are not here: they
/// are turned into error events and never fail the command itself.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("unknown session {0}")]
    NotFound(String),

    #[error("session is closed")]
    Closed,
}
