use std::sync::Arc;

use digit_lens::{ServerConfig, SessionRegistry};

/// Process-wide server state.  Per-client state lives in the sessions.
pub struct StudioState {
    pub registry: SessionRegistry,
    pub config:   ServerConfig,
}

impl StudioState {
    pub fn new(registry: SessionRegistry, config: ServerConfig) -> Self {
        StudioState { registry, config }
    }

    /// Whether chat answers come from the completion service or only from
    /// the local fallback.
    pub fn chat_online(&self) -> bool {
        self.config.chat.api_key.is_some()
    }
}

/// Shared state type, an `Arc<StudioState>` passed to every handler.
pub type SharedState = Arc<StudioState>;
