use thiserror::Error;

/// Ways a chat request can fail.  Everything except `EmptyMessage` is
/// absorbed by the responder's fallback and never reaches the user.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    #[error("chat message is empty")]
    EmptyMessage,

    #[error("no completion-service credential configured")]
    MissingCredential,

    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion service answered with HTTP {0}")]
    Status(u16),

    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl From<ureq::Error> for ChatError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => ChatError::Status(code),
            other => ChatError::Transport(other.to_string()),
        }
    }
}
