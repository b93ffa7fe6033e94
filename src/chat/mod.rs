pub mod error;
pub mod prompt;
pub mod fallback;
pub mod completion;
pub mod responder;

pub use error::ChatError;
pub use prompt::render_system_prompt;
pub use fallback::fallback_response;
pub use completion::{service_from_config, CompletionService, OpenAiClient, Unavailable};
pub use responder::{validate_message, ChatResponder};
