use serde::Serialize;

use crate::context::StatusKind;
use crate::engine::EngineEvent;
use crate::layers::LayerDescriptor;
use crate::narration::Narration;

/// Everything the server pushes down a session channel.
///
/// Serializes as `{"event": <name>, "data": {...}}`; engine events keep
/// their own names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    SessionReady {
        session_id: String,
        layers: Vec<LayerDescriptor>,
    },
    TrainingError {
        message: String,
    },
    ProcessingError {
        message: String,
    },
    ParameterUpdateConfirmed {
        learning_rate: f64,
    },
    ParameterUpdateError {
        message: String,
    },
    LiveStatus {
        kind: StatusKind,
        text: String,
    },
    ChatResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(untagged)]
    Engine(EngineEvent),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SessionReady { .. }             => "session-ready",
            ServerEvent::TrainingError { .. }            => "training-error",
            ServerEvent::ProcessingError { .. }          => "processing-error",
            ServerEvent::ParameterUpdateConfirmed { .. } => "parameter-update-confirmed",
            ServerEvent::ParameterUpdateError { .. }     => "parameter-update-error",
            ServerEvent::LiveStatus { .. }               => "live-status",
            ServerEvent::ChatResponse { .. }             => "chat-response",
            ServerEvent::Engine(e)                       => e.name(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ServerEvent::TrainingError { .. }
                | ServerEvent::ProcessingError { .. }
                | ServerEvent::ParameterUpdateError { .. }
        )
    }

    pub fn reply(text: String) -> Self {
        ServerEvent::ChatResponse { response: Some(text), error: None }
    }

    pub fn reply_error(message: String) -> Self {
        ServerEvent::ChatResponse { response: None, error: Some(message) }
    }

    /// The `data` part of the wire form.
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        Ok(value
            .get_mut("data")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null))
    }
}

impl From<EngineEvent> for ServerEvent {
    fn from(event: EngineEvent) -> Self {
        ServerEvent::Engine(event)
    }
}

impl From<Narration> for ServerEvent {
    fn from(n: Narration) -> Self {
        ServerEvent::LiveStatus { kind: n.kind, text: n.text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::metric;

    #[test]
    fn session_events_use_kebab_names_and_camel_fields() {
        let ev = ServerEvent::ParameterUpdateConfirmed { learning_rate: 0.01 };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "parameter-update-confirmed");
        assert_eq!(json["data"]["learningRate"], 0.01);
        assert_eq!(json["event"], ev.name());
    }

    #[test]
    fn engine_events_keep_their_own_shape() {
        let inner = EngineEvent::TrainingStep {
            epoch: 1,
            batch: 2,
            loss: metric(0.5),
            accuracy: metric(0.75),
        };
        let ev = ServerEvent::from(inner.clone());
        assert_eq!(serde_json::to_value(&ev).unwrap(), serde_json::to_value(&inner).unwrap());
        assert_eq!(ev.name(), "training-step");
        assert_eq!(ev.payload().unwrap()["loss"], "0.5000");
    }

    #[test]
    fn chat_response_omits_missing_half() {
        let ok = serde_json::to_value(ServerEvent::reply("hi".into())).unwrap();
        assert_eq!(ok["data"], serde_json::json!({ "response": "hi" }));
        let err = serde_json::to_value(ServerEvent::reply_error("down".into())).unwrap();
        assert_eq!(err["data"], serde_json::json!({ "error": "down" }));
    }

    #[test]
    fn live_status_carries_kind() {
        let ev = ServerEvent::LiveStatus { kind: StatusKind::Training, text: "go".into() };
        let data = ev.payload().unwrap();
        assert_eq!(data["kind"], "training");
        assert_eq!(data["text"], "go");
    }
}
