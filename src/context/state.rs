use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::train_config::{DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE};

// ---------------------------------------------------------------------------
// Training / processing mirrors
// ---------------------------------------------------------------------------

/// What the client knows about the current (or last) training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingState {
    pub is_training:   bool,
    pub epochs:        usize,
    pub learning_rate: f64,
    pub current_epoch: usize,
    pub current_batch: usize,
    /// Four-decimal string exactly as it arrived on the wire.
    pub last_loss:     Option<String>,
    pub last_accuracy: Option<String>,
}

impl Default for TrainingState {
    fn default() -> Self {
        TrainingState {
            is_training:   false,
            epochs:        DEFAULT_EPOCHS,
            learning_rate: DEFAULT_LEARNING_RATE,
            current_epoch: 0,
            current_batch: 0,
            last_loss:     None,
            last_accuracy: None,
        }
    }
}

/// Progress of the current (or last) processing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingState {
    pub is_processing:        bool,
    pub current_layer_index:  Option<usize>,
    pub activations_by_layer: BTreeMap<usize, Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// Category of a live-status message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    #[default]
    Info,
    Training,
    Processing,
    Success,
    Thinking,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusKind::Info       => "info",
            StatusKind::Training   => "training",
            StatusKind::Processing => "processing",
            StatusKind::Success    => "success",
            StatusKind::Thinking   => "thinking",
        };
        f.write_str(s)
    }
}

/// One user action, e.g. `canvas_cleared` or `training_started`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub action: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One live-status narration shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: StatusKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub sender: ChatSender,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}
