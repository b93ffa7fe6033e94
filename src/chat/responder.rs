use tracing::{debug, warn};

use crate::chat::completion::CompletionService;
use crate::chat::error::ChatError;
use crate::chat::fallback::fallback_response;
use crate::chat::prompt::render_system_prompt;
use crate::context::Snapshot;

/// Rejects blank messages and returns the trimmed text.
pub fn validate_message(message: &str) -> Result<&str, ChatError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        Err(ChatError::EmptyMessage)
    } else {
        Ok(trimmed)
    }
}

/// Answers chat messages, preferring the completion service and falling
/// back to canned, state-aware answers when it fails.
pub struct ChatResponder {
    service: Box<dyn CompletionService>,
}

impl ChatResponder {
    pub fn new(service: Box<dyn CompletionService>) -> Self {
        ChatResponder { service }
    }

    /// Never fails; messages must already have passed [`validate_message`].
    pub fn respond(&self, message: &str, snapshot: &Snapshot) -> String {
        let system_prompt = render_system_prompt(snapshot);
        debug!(prompt_len = system_prompt.len(), "requesting chat completion");

        match self.service.complete(&system_prompt, message) {
            Ok(reply) => reply,
            Err(ChatError::MissingCredential) => fallback_response(message, snapshot),
            Err(e) => {
                warn!(error = %e, "chat completion failed; using fallback");
                fallback_response(message, snapshot)
            }
        }
    }
}
