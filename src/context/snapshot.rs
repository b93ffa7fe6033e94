use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::state::{ChatEntry, ExplanationEntry, InteractionEntry, ProcessingState, TrainingState};
use crate::engine::PredictionResult;
use crate::layers::LayerDescriptor;

/// Frozen copy of a session's state, handed to the chat responder.
///
/// Clients may send one along with a chat message; every field defaults so
/// a partial snapshot still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub has_drawing:     bool,
    pub last_prediction: Option<PredictionResult>,
    pub training:        TrainingState,
    pub processing:      ProcessingState,
    pub layers:          Vec<LayerDescriptor>,
    /// Layer currently, or most recently, highlighted in the graph.
    pub focus_layer:     Option<usize>,
    pub interactions:    Vec<InteractionEntry>,
    pub opened_help:     Vec<String>,
    pub explanations:    Vec<ExplanationEntry>,
    pub chat:            Vec<ChatEntry>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub taken_at:        DateTime<Utc>,
}

impl Snapshot {
    pub fn focus(&self) -> Option<&LayerDescriptor> {
        self.focus_layer.and_then(|i| self.layers.get(i))
    }

    pub fn latest_explanation(&self) -> Option<&ExplanationEntry> {
        self.explanations.last()
    }

    /// The newest `n` items of `items`, oldest first.
    pub fn tail<T>(items: &[T], n: usize) -> &[T] {
        &items[items.len().saturating_sub(n)..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let snap: Snapshot = serde_json::from_str(r#"{"hasDrawing": true}"#).unwrap();
        assert!(snap.has_drawing);
        assert!(snap.last_prediction.is_none());
        assert_eq!(snap.training, TrainingState::default());
        assert!(snap.focus().is_none());
    }

    #[test]
    fn tail_clamps() {
        assert_eq!(Snapshot::tail(&[1, 2, 3], 2), &[2, 3]);
        assert_eq!(Snapshot::tail(&[1, 2, 3], 9), &[1, 2, 3]);
    }
}
