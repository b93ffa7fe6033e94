pub mod error;
pub mod events;
pub mod sink;
pub mod pacing;
pub mod train_config;
pub mod prediction;
pub mod input;
pub mod mock;

pub use error::EngineError;
pub use events::{EngineEvent, WeightStats};
pub use sink::EventSink;
pub use pacing::Pacing;
pub use train_config::{ParameterUpdate, TrainRequest, TrainSummary};
pub use prediction::PredictionResult;
pub use input::{InputImage, InputPreparer, SyntheticDigit};
pub use mock::MockEngine;

use crate::layers::LayerRegistry;

/// A model that can be trained and run layer by layer while reporting
/// progress.
///
/// Both long-running operations stream their progress into an [`EventSink`]
/// instead of returning it all at the end; the return value is only the
/// summary of a run that finished.  Implementations must emit events in
/// the documented order and must stop at the next suspension point once
/// the sink reports cancellation.
pub trait Engine: Send {
    /// The layers this engine walks during `process`, in order.
    fn layers(&self) -> &LayerRegistry;

    /// Runs `request.epochs` epochs, emitting
    /// `training-epoch-start`, `training-step`*, `training-epoch-complete`
    /// per epoch and a final `training-complete`.
    fn train(&mut self, request: &TrainRequest, sink: &mut dyn EventSink) -> Result<TrainSummary, EngineError>;

    /// Pushes one input through every layer, emitting
    /// `processing-start`, per-layer start / filter / complete events and a
    /// final `processing-complete`.
    fn process(&mut self, input: &InputImage, sink: &mut dyn EventSink) -> Result<PredictionResult, EngineError>;

    /// Best-effort reconfiguration; fields left as `None` are untouched.
    fn update_parameters(&mut self, update: &ParameterUpdate) -> Result<(), EngineError>;

    fn learning_rate(&self) -> f64;

    /// Releases held resources.  Calling it more than once is harmless.
    fn dispose(&mut self);
}
