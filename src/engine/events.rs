use serde::{Deserialize, Serialize};

use crate::layers::LayerDescriptor;

/// Summary statistics of one layer's weight tensor after a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightStats {
    pub mean: f64,
    pub std: f64,
    pub shape: Vec<usize>,
}

/// Progress reported by an engine while it trains or processes an input.
///
/// Serialized adjacently tagged: `{"event": "training-step", "data": {...}}`.
/// The event name becomes the SSE event name and `data` its payload.
/// Loss and accuracy travel as fixed four-decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum EngineEvent {
    TrainingEpochStart {
        epoch: usize,
        total: usize,
    },
    TrainingStep {
        epoch: usize,
        batch: usize,
        loss: String,
        accuracy: String,
    },
    WeightUpdate {
        layer_index: usize,
        layer_name: String,
        epoch: usize,
        batch: usize,
        weight_stats: WeightStats,
    },
    TrainingEpochComplete {
        epoch: usize,
        avg_loss: String,
        avg_accuracy: String,
    },
    TrainingComplete {
        final_loss: String,
        final_accuracy: String,
        message: String,
    },
    ProcessingStart {
        total_layers: usize,
    },
    LayerProcessingStart {
        layer_index: usize,
        layer: LayerDescriptor,
        /// Percentage of layers already finished, in `[0, 100)`.
        progress: f64,
    },
    FilterActivation {
        layer_index: usize,
        filter_index: usize,
        activation: f64,
        feature_map: Vec<Vec<f64>>,
    },
    LayerProcessingComplete {
        layer_index: usize,
        layer: LayerDescriptor,
        activation_data: Vec<f64>,
        /// Milliseconds.
        computation_time: f64,
    },
    ProcessingComplete {
        predictions: Vec<f64>,
        predicted_class: usize,
        confidence: f64,
    },
}

impl EngineEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::TrainingEpochStart { .. }      => "training-epoch-start",
            EngineEvent::TrainingStep { .. }            => "training-step",
            EngineEvent::WeightUpdate { .. }            => "weight-update",
            EngineEvent::TrainingEpochComplete { .. }   => "training-epoch-complete",
            EngineEvent::TrainingComplete { .. }        => "training-complete",
            EngineEvent::ProcessingStart { .. }         => "processing-start",
            EngineEvent::LayerProcessingStart { .. }    => "layer-processing-start",
            EngineEvent::FilterActivation { .. }        => "filter-activation",
            EngineEvent::LayerProcessingComplete { .. } => "layer-processing-complete",
            EngineEvent::ProcessingComplete { .. }      => "processing-complete",
        }
    }
}

/// Formats a metric the way the wire protocol expects: four decimals.
pub fn metric(value: f64) -> String {
    format!("{:.4}", value)
}
