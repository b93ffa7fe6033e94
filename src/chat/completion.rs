use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chat::error::ChatError;
use crate::config::ChatConfig;

/// A remote language model that turns a system prompt and a user message
/// into a reply.
pub trait CompletionService: Send + Sync {
    fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, ChatError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model:       &'a str,
    messages:    [Message<'a>; 2],
    max_tokens:  u32,
    temperature: f64,
}

#[derive(Serialize)]
struct Message<'a> {
    role:    &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    agent:       ureq::Agent,
    api_key:     String,
    endpoint:    String,
    model:       String,
    max_tokens:  u32,
    temperature: f64,
}

impl OpenAiClient {
    /// Fails with `MissingCredential` when `config` has no API key.
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let api_key = config.api_key.clone().ok_or(ChatError::MissingCredential)?;
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Ok(OpenAiClient {
            agent,
            api_key,
            endpoint:    format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model:       config.model.clone(),
            max_tokens:  config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionService for OpenAiClient {
    fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, ChatError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                Message { role: "system", content: system_prompt },
                Message { role: "user",   content: user_message },
            ],
            max_tokens:  self.max_tokens,
            temperature: self.temperature,
        };

        let response: CompletionResponse = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&body)?
            .body_mut()
            .read_json()
            .map_err(|e| ChatError::Malformed(e.to_string()))?;

        extract_reply(response)
    }
}

fn extract_reply(response: CompletionResponse) -> Result<String, ChatError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ChatError::Malformed("no reply in choices".to_owned()))
}

// ---------------------------------------------------------------------------
// No credential
// ---------------------------------------------------------------------------

/// Stand-in used when no credential is configured; every call fails so the
/// responder answers from its local fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl CompletionService for Unavailable {
    fn complete(&self, _system_prompt: &str, _user_message: &str) -> Result<String, ChatError> {
        Err(ChatError::MissingCredential)
    }
}

/// Picks the real client when a credential is present, [`Unavailable`]
/// otherwise.
pub fn service_from_config(config: &ChatConfig) -> Box<dyn CompletionService> {
    match OpenAiClient::new(config) {
        Ok(client) => {
            info!(endpoint = client.endpoint(), model = %config.model, "chat completion service configured");
            Box::new(client)
        }
        Err(_) => {
            warn!("OPENAI_API_KEY not set; chat answers will come from the local fallback");
            Box::new(Unavailable)
        }
    }
}
