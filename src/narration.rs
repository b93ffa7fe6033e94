//! Live-status narration.
//!
//! Turns engine progress and user actions into the short, friendly sentences
//! shown in the "Live Status" panel.  Text may carry `<strong>` markup; use
//! [`strip_html`] before putting it anywhere plain.

use serde::Serialize;

use crate::context::StatusKind;
use crate::engine::EngineEvent;
use crate::layers::LayerKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narration {
    pub kind: StatusKind,
    pub text: String,
}

impl Narration {
    fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Narration { kind, text: text.into() }
    }
}

/// Narration for an engine event, or `None` for events that are too
/// frequent or too low-level to narrate (filters, weight stats, layer ends).
pub fn for_event(event: &EngineEvent) -> Option<Narration> {
    match event {
        EngineEvent::ProcessingStart { total_layers } => Some(Narration::new(
            StatusKind::Processing,
            format!(
                "Starting to analyze your drawing! The CNN will examine it through {} layers to figure out which digit you drew.",
                total_layers
            ),
        )),
        EngineEvent::LayerProcessingStart { layer, .. } => {
            let text = match &layer.kind {
                LayerKind::Input => format!(
                    "<strong>{}</strong> is taking in your drawing as a {} grid of pixel intensities.",
                    layer.name,
                    layer.shape_label()
                ),
                LayerKind::Conv { filters, kernel_size } => format!(
                    "<strong>Convolution layer</strong> is sliding {} different {}×{} filters over the image, each looking for a pattern like an edge, curve or corner.",
                    filters, kernel_size, kernel_size
                ),
                LayerKind::Pool { pool_size } => format!(
                    "<strong>Pooling layer</strong> keeps the strongest value in every {}×{} patch, shrinking the image while holding on to what matters.",
                    pool_size, pool_size
                ),
                LayerKind::Flatten => "<strong>Flatten layer</strong> is unrolling the 2D feature maps into one long list of numbers for the decision layers.".to_owned(),
                LayerKind::Dense { units } => format!(
                    "<strong>Dense layer</strong> with {} neurons is combining every feature found so far, like a committee weighing the evidence.",
                    units
                ),
                LayerKind::Output { classes } => format!(
                    "<strong>Output layer</strong> is turning the evidence into {} probabilities, one per digit.",
                    classes
                ),
                LayerKind::Dropout { rate } => format!(
                    "<strong>Dropout layer</strong> would silence {:.0}% of neurons during training; while predicting it lets everything through.",
                    rate * 100.0
                ),
            };
            Some(Narration::new(StatusKind::Processing, text))
        }
        EngineEvent::ProcessingComplete { predicted_class, confidence, .. } => Some(Narration::new(
            StatusKind::Success,
            format!(
                "<strong>Analysis complete!</strong> The CNN thinks your drawing is the digit <strong>{}</strong> with {:.1}% confidence.",
                predicted_class,
                confidence * 100.0
            ),
        )),
        EngineEvent::TrainingEpochStart { epoch, total } => Some(Narration::new(
            StatusKind::Training,
            format!(
                "<strong>Training epoch {}/{}</strong>: the network is about to study a fresh pass of example digits.",
                epoch, total
            ),
        )),
        EngineEvent::TrainingStep { epoch, batch, loss, accuracy } => Some(Narration::new(
            StatusKind::Training,
            format!(
                "<strong>Learning in progress.</strong> Epoch {}, batch {}. Loss: {} (lower is better), accuracy: {} (higher is better).",
                epoch, batch, loss, accuracy
            ),
        )),
        EngineEvent::TrainingEpochComplete { epoch, avg_loss, avg_accuracy } => Some(Narration::new(
            StatusKind::Training,
            format!(
                "<strong>Epoch {} completed.</strong> Average loss: {}, average accuracy: {}.",
                epoch, avg_loss, avg_accuracy
            ),
        )),
        EngineEvent::TrainingComplete { final_loss, final_accuracy, .. } => Some(Narration::new(
            StatusKind::Success,
            format!(
                "<strong>Training finished!</strong> Final loss {}, accuracy {}. Draw a digit to test what it learned.",
                final_loss, final_accuracy
            ),
        )),
        EngineEvent::WeightUpdate { .. }
        | EngineEvent::FilterActivation { .. }
        | EngineEvent::LayerProcessingComplete { .. } => None,
    }
}

pub fn training_requested(epochs: usize, learning_rate: f64) -> Narration {
    Narration::new(
        StatusKind::Training,
        format!(
            "<strong>Starting training!</strong> The network will study {} rounds of example images with a learning rate of {}.",
            epochs, learning_rate
        ),
    )
}

pub fn processing_requested() -> Narration {
    Narration::new(
        StatusKind::Thinking,
        "<strong>Starting CNN analysis!</strong> Your drawing is on its way through the network.",
    )
}

pub fn canvas_cleared() -> Narration {
    Narration::new(
        StatusKind::Info,
        "Canvas cleared! Draw a digit (0-9) and then click \"Process Through CNN\".",
    )
}

pub fn image_uploaded() -> Narration {
    Narration::new(
        StatusKind::Info,
        "<strong>Image uploaded!</strong> Click \"Process Through CNN\" to see how the network reads it.",
    )
}

pub fn failure(what: &str, message: &str) -> Narration {
    Narration::new(StatusKind::Info, format!("{} failed: {}", what, message))
}

/// Removes anything between `<` and `>`.
pub fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Cuts `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}
