use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::error::EngineError;
use crate::engine::events::{metric, EngineEvent, WeightStats};
use crate::engine::input::InputImage;
use crate::engine::pacing::{pause, Pacing};
use crate::engine::prediction::{normalize, PredictionResult};
use crate::engine::sink::EventSink;
use crate::engine::train_config::{
    validate_learning_rate, ParameterUpdate, TrainRequest, TrainSummary, DEFAULT_LEARNING_RATE,
};
use crate::engine::Engine;
use crate::layers::{LayerDescriptor, LayerKind, LayerRegistry};

/// Size of the pretend training set; with the default batch size of 32 this
/// gives eight steps per epoch.
pub const SYNTHETIC_SAMPLES: usize = 256;

/// Largest feature map edge sent to the client.
const FEATURE_MAP_MAX_SIDE: usize = 20;

const NUM_CLASSES: usize = 10;

/// An engine that fabricates believable numbers instead of doing maths.
///
/// Loss decays and accuracy climbs smoothly over the epochs, activations
/// have some structure, and predictions always favour one digit.  Nothing
/// here is learned; the point is to drive the visualization.
pub struct MockEngine {
    layers:        LayerRegistry,
    pacing:        Pacing,
    rng:           StdRng,
    learning_rate: f64,
    is_training:   bool,
    disposed:      bool,
}

impl MockEngine {
    pub fn new(layers: LayerRegistry, pacing: Pacing) -> Self {
        MockEngine::with_rng(layers, pacing, StdRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn with_seed(layers: LayerRegistry, pacing: Pacing, seed: u64) -> Self {
        MockEngine::with_rng(layers, pacing, StdRng::seed_from_u64(seed))
    }

    fn with_rng(layers: LayerRegistry, pacing: Pacing, rng: StdRng) -> Self {
        MockEngine {
            layers,
            pacing,
            rng,
            learning_rate: DEFAULT_LEARNING_RATE,
            is_training: false,
            disposed: false,
        }
    }

    pub fn is_training(&self) -> bool {
        self.is_training
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.disposed {
            Err(EngineError::Disposed)
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Training
    // -----------------------------------------------------------------------

    fn run_epochs(&mut self, request: &TrainRequest, sink: &mut dyn EventSink) -> Result<TrainSummary, EngineError> {
        let epochs = request.epochs;
        let batches = SYNTHETIC_SAMPLES.div_ceil(request.batch_size);
        // A larger step size makes the pretend loss fall faster.
        let lr_scale = (self.learning_rate / DEFAULT_LEARNING_RATE).clamp(0.25, 4.0);

        let mut final_loss = 0.0;
        let mut final_accuracy = 0.0;

        for epoch in 1..=epochs {
            sink.checkpoint()?;
            sink.emit(EngineEvent::TrainingEpochStart { epoch, total: epochs })?;

            let progress = (epoch - 1) as f64;
            let base_loss = 2.3 * (-0.3 * progress * lr_scale).exp();
            let base_accuracy = 0.1 + (progress / epochs as f64) * 0.8;

            let mut loss_sum = 0.0;
            let mut accuracy_sum = 0.0;

            for batch in 1..=batches {
                pause(self.pacing.batch_delay, &*sink)?;

                let loss = (base_loss + (self.rng.gen::<f64>() - 0.5) * 0.1).max(0.01);
                let accuracy = (base_accuracy + (self.rng.gen::<f64>() - 0.5) * 0.05).clamp(0.01, 0.99);
                loss_sum += loss;
                accuracy_sum += accuracy;

                sink.emit(EngineEvent::TrainingStep {
                    epoch,
                    batch,
                    loss: metric(loss),
                    accuracy: metric(accuracy),
                })?;
                self.emit_weight_updates(epoch, batch, sink)?;
            }

            final_loss = loss_sum / batches as f64;
            final_accuracy = accuracy_sum / batches as f64;

            sink.emit(EngineEvent::TrainingEpochComplete {
                epoch,
                avg_loss: metric(final_loss),
                avg_accuracy: metric(final_accuracy),
            })?;
        }

        sink.emit(EngineEvent::TrainingComplete {
            final_loss: metric(final_loss),
            final_accuracy: metric(final_accuracy),
            message: "CNN training completed successfully!".to_owned(),
        })?;

        Ok(TrainSummary { epochs_completed: epochs, final_loss, final_accuracy })
    }

    fn emit_weight_updates(&mut self, epoch: usize, batch: usize, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let layers = self.layers.clone();
        for (index, layer) in layers.iter().enumerate() {
            if !layer.kind.has_weights() {
                continue;
            }
            let previous = index.checked_sub(1).and_then(|i| layers.get(i));
            let stats = WeightStats {
                mean: (self.rng.gen::<f64>() - 0.5) * 0.1,
                std: self.rng.gen::<f64>() * 0.5 + 0.1,
                shape: weight_shape(layer, previous),
            };
            sink.emit(EngineEvent::WeightUpdate {
                layer_index: index,
                layer_name: layer.name.clone(),
                epoch,
                batch,
                weight_stats: stats,
            })?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Processing
    // -----------------------------------------------------------------------

    fn run_layers(&mut self, input: &InputImage, sink: &mut dyn EventSink) -> Result<PredictionResult, EngineError> {
        let layers = self.layers.clone();
        let total = layers.len();

        sink.checkpoint()?;
        sink.emit(EngineEvent::ProcessingStart { total_layers: total })?;

        for (index, layer) in layers.iter().enumerate() {
            sink.checkpoint()?;
            sink.emit(EngineEvent::LayerProcessingStart {
                layer_index: index,
                layer: layer.clone(),
                progress: index as f64 / total as f64 * 100.0,
            })?;

            let delay = self.pacing.layer_pause(&mut self.rng);
            pause(delay, &*sink)?;

            for filter_index in 0..layer.filter_event_count() {
                let activation = self.rng.gen::<f64>() * 0.8 + 0.1;
                let feature_map = self.feature_map(layer, activation);
                sink.emit(EngineEvent::FilterActivation {
                    layer_index: index,
                    filter_index,
                    activation,
                    feature_map,
                })?;
                pause(self.pacing.filter_delay, &*sink)?;
            }

            let activation_data = self.activation_sample(layer, input);
            sink.emit(EngineEvent::LayerProcessingComplete {
                layer_index: index,
                layer: layer.clone(),
                activation_data,
                computation_time: self.rng.gen::<f64>() * 50.0 + 15.0,
            })?;
        }

        let result = PredictionResult::from_probabilities(self.fabricate_predictions());
        sink.emit(EngineEvent::ProcessingComplete {
            predictions: result.predictions.clone(),
            predicted_class: result.predicted_class,
            confidence: result.confidence,
        })?;
        Ok(result)
    }

    /// Centre-weighted grid, at most 20×20, brighter for stronger filters.
    fn feature_map(&mut self, layer: &LayerDescriptor, activation: f64) -> Vec<Vec<f64>> {
        let Some((h, w)) = layer.spatial_dims() else {
            return Vec::new();
        };
        let height = h.min(FEATURE_MAP_MAX_SIDE);
        let width = w.min(FEATURE_MAP_MAX_SIDE);
        let falloff = (height as f64 / 3.0).max(1.0);

        (0..height)
            .map(|row| {
                (0..width)
                    .map(|col| {
                        let dr = row as f64 - height as f64 / 2.0;
                        let dc = col as f64 - width as f64 / 2.0;
                        let spatial = (-(dr * dr + dc * dc).sqrt() / falloff).exp();
                        let value = activation * spatial * (0.7 + self.rng.gen::<f64>() * 0.6);
                        value.clamp(0.0, 1.0)
                    })
                    .collect()
            })
            .collect()
    }

    /// Values for the per-layer activation strip.  The input layer reports
    /// evenly spaced real pixels; everything else gets a wavy pattern with
    /// noise.
    fn activation_sample(&mut self, layer: &LayerDescriptor, input: &InputImage) -> Vec<f64> {
        let len = layer.activation_sample_len();
        match layer.kind {
            LayerKind::Input => {
                let stride = (input.pixels.len() / len).max(1);
                input.pixels.iter().step_by(stride).take(len).copied().collect()
            }
            LayerKind::Conv { .. }
            | LayerKind::Pool { .. }
            | LayerKind::Flatten
            | LayerKind::Dense { .. }
            | LayerKind::Output { .. }
            | LayerKind::Dropout { .. } => (0..len)
                .map(|i| {
                    let base = (i as f64 * 0.3).sin() * 0.3 + 0.5;
                    let noise = (self.rng.gen::<f64>() - 0.5) * 0.4;
                    (base + noise).clamp(0.0, 1.0)
                })
                .collect(),
        }
    }

    /// One confident class, the rest sharing a small remainder.
    fn fabricate_predictions(&mut self) -> Vec<f64> {
        let confident = self.rng.gen_range(0..NUM_CLASSES);
        let weights: Vec<f64> = (0..NUM_CLASSES)
            .map(|class| {
                if class == confident {
                    0.6 + self.rng.gen::<f64>() * 0.3
                } else {
                    self.rng.gen::<f64>() * 0.1
                }
            })
            .collect();
        normalize(&weights)
    }
}

impl Engine for MockEngine {
    fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    fn train(&mut self, request: &TrainRequest, sink: &mut dyn EventSink) -> Result<TrainSummary, EngineError> {
        self.ensure_live()?;
        if self.is_training {
            return Err(EngineError::Busy);
        }
        validate_learning_rate(request.learning_rate)?;
        if request.batch_size == 0 {
            return Err(EngineError::InvalidInput("batch size must be at least 1".into()));
        }

        self.learning_rate = request.learning_rate;
        self.is_training = true;
        let result = self.run_epochs(request, sink);
        self.is_training = false;
        result
    }

    fn process(&mut self, input: &InputImage, sink: &mut dyn EventSink) -> Result<PredictionResult, EngineError> {
        self.ensure_live()?;
        if input.pixels.is_empty() {
            return Err(EngineError::InvalidInput("input image has no pixels".into()));
        }
        self.run_layers(input, sink)
    }

    fn update_parameters(&mut self, update: &ParameterUpdate) -> Result<(), EngineError> {
        self.ensure_live()?;
        if let Some(lr) = update.learning_rate {
            validate_learning_rate(lr)?;
            self.learning_rate = lr;
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn dispose(&mut self) {
        self.is_training = false;
        self.disposed = true;
    }
}

/// Weight tensor shape for a layer, derived from its neighbour.
fn weight_shape(layer: &LayerDescriptor, previous: Option<&LayerDescriptor>) -> Vec<usize> {
    let fan_in = previous.map(|p| p.output_len()).unwrap_or(0);
    match &layer.kind {
        LayerKind::Conv { filters, kernel_size } => {
            let channels = previous
                .and_then(|p| p.output_shape.last().copied())
                .unwrap_or(1);
            vec![*kernel_size, *kernel_size, channels, *filters]
        }
        LayerKind::Dense { units }    => vec![fan_in, *units],
        LayerKind::Output { classes } => vec![fan_in, *classes],
        LayerKind::Input
        | LayerKind::Pool { .. }
        | LayerKind::Flatten
        | LayerKind::Dropout { .. } => Vec::new(),
    }
}
