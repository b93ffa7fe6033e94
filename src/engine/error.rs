use thiserror::Error;

/// Failures raised by an [`Engine`](crate::engine::Engine) run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("training is already in progress")]
    Busy,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("event receiver disconnected")]
    Disconnected,

    #[error("engine has been disposed")]
    Disposed,

    #[error("numeric failure: {0}")]
    Numeric(String),

    #[error("engine panicked: {0}")]
    Panicked(String),
}

impl EngineError {
    /// True for the variants that mean "nobody is listening any more";
    /// these end a run quietly instead of being reported to the client.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, EngineError::Cancelled | EngineError::Disconnected)
    }
}
