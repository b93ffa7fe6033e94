use serde::{Deserialize, Serialize};

use crate::context::Snapshot;
use crate::engine::ParameterUpdate;
use crate::session::error::SessionError;

/// A message from the client, posted as `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Command {
    StartTraining(TrainingParams),
    ProcessImage(ProcessParams),
    UpdateParameters(ParameterUpdate),
    ChatMessage(ChatParams),
    UserAction(UserAction),
}

impl Command {
    pub fn from_json(body: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::StartTraining(_)    => "start-training",
            Command::ProcessImage(_)     => "process-image",
            Command::UpdateParameters(_) => "update-parameters",
            Command::ChatMessage(_)      => "chat-message",
            Command::UserAction(_)       => "user-action",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingParams {
    pub epochs:        Option<usize>,
    pub learning_rate: Option<f64>,
    pub batch_size:    Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessParams {
    pub image_data_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParams {
    pub message: String,
    /// Client-side view of the application; replaces the server snapshot
    /// for this one answer when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Snapshot>,
}

/// UI interactions reported so the assistant knows what the user did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum UserAction {
    StartedDrawing,
    CanvasCleared,
    ImageUploaded {
        #[serde(default)]
        file_name: Option<String>,
    },
    ParametersChanged {
        #[serde(default)]
        epochs: Option<usize>,
        #[serde(default)]
        learning_rate: Option<f64>,
    },
    HelpOpened {
        topic: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_training() {
        let cmd = Command::from_json(
            r#"{"type":"start-training","data":{"epochs":3,"learningRate":0.001}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::StartTraining(TrainingParams {
                epochs: Some(3),
                learning_rate: Some(0.001),
                batch_size: None,
            })
        );
        assert_eq!(cmd.name(), "start-training");
    }

    #[test]
    fn parses_process_image() {
        let cmd = Command::from_json(
            r#"{"type":"process-image","data":{"imageDataUrl":"data:image/png;base64,AAAA"}}"#,
        )
        .unwrap();
        assert!(matches!(cmd, Command::ProcessImage(p) if p.image_data_url.ends_with("AAAA")));
    }

    #[test]
    fn parses_chat_with_partial_context() {
        let cmd = Command::from_json(
            r#"{"type":"chat-message","data":{"message":"hi","context":{"hasDrawing":true}}}"#,
        )
        .unwrap();
        let Command::ChatMessage(chat) = cmd else { panic!("wrong variant") };
        assert_eq!(chat.message, "hi");
        assert!(chat.context.unwrap().has_drawing);
    }

    #[test]
    fn parses_user_actions() {
        let cleared = Command::from_json(r#"{"type":"user-action","data":{"action":"canvas-cleared"}}"#).unwrap();
        assert_eq!(cleared, Command::UserAction(UserAction::CanvasCleared));

        let changed = Command::from_json(
            r#"{"type":"user-action","data":{"action":"parameters-changed","learningRate":0.01}}"#,
        )
        .unwrap();
        assert_eq!(
            changed,
            Command::UserAction(UserAction::ParametersChanged { epochs: None, learning_rate: Some(0.01) })
        );

        let upload = Command::from_json(
            r#"{"type":"user-action","data":{"action":"image-uploaded","fileName":"seven.png"}}"#,
        )
        .unwrap();
        assert_eq!(
            upload,
            Command::UserAction(UserAction::ImageUploaded { file_name: Some("seven.png".into()) })
        );
    }

    #[test]
    fn unknown_type_is_malformed() {
        let err = Command::from_json(r#"{"type":"launch-rockets","data":{}}"#).unwrap_err();
        assert!(matches!(err, SessionError::Malformed(_)));
    }
}
