use serde::{Deserialize, Serialize};

use crate::engine::error::EngineError;

pub const DEFAULT_EPOCHS: usize = 5;
pub const MAX_EPOCHS: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;

/// Parameters for one `Engine::train` run.
///
/// # Fields
/// - `epochs`: full passes over the (synthetic) training set
/// - `batch_size`: samples per mini-batch; sets how many `training-step`
///   events each epoch produces
/// - `learning_rate`: applied to the engine before the first epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainRequest {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for TrainRequest {
    fn default() -> Self {
        TrainRequest {
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }
}

impl TrainRequest {
    /// Builds a request from optional client values.
    ///
    /// Missing fields and `epochs == 0` take the defaults; anything out of
    /// range is rejected rather than clamped.
    pub fn from_parts(
        epochs: Option<usize>,
        batch_size: Option<usize>,
        learning_rate: Option<f64>,
    ) -> Result<Self, EngineError> {
        let epochs = match epochs {
            None | Some(0) => DEFAULT_EPOCHS,
            Some(e) if e > MAX_EPOCHS => {
                return Err(EngineError::InvalidInput(format!(
                    "epochs must be at most {}, got {}",
                    MAX_EPOCHS, e
                )));
            }
            Some(e) => e,
        };
        let batch_size = match batch_size {
            None => DEFAULT_BATCH_SIZE,
            Some(0) => return Err(EngineError::InvalidInput("batch size must be at least 1".into())),
            Some(b) => b,
        };
        let learning_rate = learning_rate.unwrap_or(DEFAULT_LEARNING_RATE);
        validate_learning_rate(learning_rate)?;

        Ok(TrainRequest { epochs, batch_size, learning_rate })
    }
}

pub(crate) fn validate_learning_rate(lr: f64) -> Result<(), EngineError> {
    if lr.is_finite() && lr > 0.0 && lr <= 1.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "learning rate must be in (0, 1], got {}",
            lr
        )))
    }
}

/// Partial reconfiguration of an engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
}

/// What a finished training run reports back to its caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSummary {
    pub epochs_completed: usize,
    pub final_loss: f64,
    pub final_accuracy: f64,
}
