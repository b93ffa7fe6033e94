use serde::{Deserialize, Serialize};

/// Outcome of one completed processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// Digit in `0..=9`.
    pub predicted_class: usize,
    /// Probability of `predicted_class`, in `[0, 1]`.
    pub confidence: f64,
    /// One probability per class, summing to 1.
    pub predictions: Vec<f64>,
}

impl PredictionResult {
    /// Picks the most probable class out of a probability vector.
    pub fn from_probabilities(predictions: Vec<f64>) -> Self {
        let predicted_class = argmax(&predictions);
        let confidence = predictions.get(predicted_class).copied().unwrap_or(0.0);
        PredictionResult { predicted_class, confidence, predictions }
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Scales non-negative weights so they sum to 1.  An all-zero input becomes
/// the uniform distribution.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let sum: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if sum <= 0.0 {
        return vec![1.0 / weights.len().max(1) as f64; weights.len()];
    }
    weights.iter().map(|w| w.max(0.0) / sum).collect()
}
