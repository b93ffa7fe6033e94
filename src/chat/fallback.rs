use crate::context::Snapshot;
use crate::engine::prediction::argmax;
use crate::narration::{strip_html, truncate_chars};

/// Longest live-status excerpt quoted in the default answer.
pub const STATUS_EXCERPT_CAP: usize = 160;

/// Answers locally when the completion service cannot.
///
/// The lowercased message is matched against topic buckets in order:
/// prediction, training, layers, canvas, "what's happening".  The answer is
/// filled in from `snapshot`; anything else gets a general invitation.
pub fn fallback_response(message: &str, snapshot: &Snapshot) -> String {
    let m = message.to_lowercase();

    if contains_any(&m, &["prediction", "predict", "guess", "confiden"]) {
        return about_prediction(snapshot);
    }
    if contains_any(&m, &["training", "train", "epoch", "learning rate", "loss", "accuracy"]) {
        return about_training(snapshot);
    }
    if contains_any(&m, &["layer", "convolution", "conv", "pooling", "pool", "filter", "dense"]) {
        return about_layers(snapshot);
    }
    if contains_any(&m, &["draw", "canvas"]) {
        return about_canvas(snapshot);
    }
    if contains_any(&m, &["what's happening", "whats happening", "what is happening", "going on", "right now"]) {
        return about_now(snapshot);
    }
    default_answer(snapshot)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn about_prediction(s: &Snapshot) -> String {
    let Some(pred) = &s.last_prediction else {
        return "No prediction has been made yet. Draw a digit (0-9) on the canvas and click \
                \"Process Through CNN\" to see what the network predicts!"
            .to_owned();
    };

    let mut answer = format!(
        "Based on your drawing, the CNN predicted the digit {} with {:.1}% confidence.",
        pred.predicted_class,
        pred.confidence * 100.0
    );
    let mut others = pred.predictions.clone();
    if pred.predicted_class < others.len() {
        others[pred.predicted_class] = f64::NEG_INFINITY;
        let runner_up = argmax(&others);
        if let Some(p) = pred.predictions.get(runner_up) {
            answer.push_str(&format!(
                " Its second choice was {} at {:.1}%.",
                runner_up,
                p * 100.0
            ));
        }
    }
    answer.push_str(" The network reached this by passing your drawing through every layer in turn.");
    answer
}

fn about_training(s: &Snapshot) -> String {
    let t = &s.training;
    if t.is_training {
        let mut answer = format!(
            "Training is in progress! The network is learning over {} epochs with a learning rate of {}.",
            t.epochs, t.learning_rate
        );
        if t.current_epoch > 0 {
            answer.push_str(&format!(
                " It is on epoch {}, batch {}.",
                t.current_epoch, t.current_batch
            ));
        }
        if let (Some(loss), Some(acc)) = (&t.last_loss, &t.last_accuracy) {
            answer.push_str(&format!(" Current performance: loss {}, accuracy {}.", loss, acc));
        }
        return answer;
    }

    match (&t.last_loss, &t.last_accuracy) {
        (Some(loss), Some(acc)) => format!(
            "The network isn't training right now. The last run ended with loss {} and accuracy {}. \
             Click \"Start Training\" to run {} more epochs at a learning rate of {}.",
            loss, acc, t.epochs, t.learning_rate
        ),
        _ => format!(
            "The network isn't currently training. Click \"Start Training\" to teach it with {} epochs \
             at a learning rate of {}.",
            t.epochs, t.learning_rate
        ),
    }
}

fn about_layers(s: &Snapshot) -> String {
    match s.focus() {
        Some(layer) => format!(
            "The network is currently processing the {} layer ({}). This layer {}.",
            layer.name,
            layer.kind.tag(),
            layer.kind.explanation()
        ),
        None => format!(
            "The CNN has {} layers: convolution layers detect patterns, pooling layers reduce size, \
             and dense layers make the final decision. Each layer transforms your image step by step!",
            s.layers.len()
        ),
    }
}

fn about_canvas(s: &Snapshot) -> String {
    if s.has_drawing {
        "There is a drawing on the canvas! Click \"Process Through CNN\" to watch the network analyze it \
         layer by layer."
            .to_owned()
    } else {
        "The canvas is empty. Draw a digit (0-9) with your mouse or finger, then process it through the \
         CNN to see how it recognizes your drawing!"
            .to_owned()
    }
}

fn about_now(s: &Snapshot) -> String {
    if s.processing.is_processing {
        let layer = s
            .processing
            .current_layer_index
            .and_then(|i| s.layers.get(i).map(|l| (i, l)));
        return match layer {
            Some((i, l)) => format!(
                "Your drawing is being processed right now: layer {} of {} ({}), which {}.",
                i + 1,
                s.layers.len(),
                l.name,
                l.kind.explanation()
            ),
            None => "Your drawing is being processed right now.".to_owned(),
        };
    }
    if s.training.is_training {
        return about_training(s);
    }
    match s.latest_explanation() {
        Some(latest) => format!(
            "Nothing is running at the moment. The last update was: {}",
            truncate_chars(&strip_html(&latest.text), STATUS_EXCERPT_CAP)
        ),
        None => "Nothing is running at the moment. Draw a digit or start training to get things moving!".to_owned(),
    }
}

fn default_answer(s: &Snapshot) -> String {
    let invitation = "I'm here to help you understand this CNN visualization! You can ask me about the \
                      current prediction, training progress, what each layer does, or anything else about \
                      how neural networks work. What would you like to know?";
    match s.latest_explanation() {
        Some(latest) => format!(
            "Latest status: {}\n\n{}",
            truncate_chars(&strip_html(&latest.text), STATUS_EXCERPT_CAP),
            invitation
        ),
        None => invitation.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextAggregator, StatusKind};
    use crate::engine::EngineEvent;
    use crate::layers::LayerRegistry;

    fn snap(f: impl FnOnce(&mut ContextAggregator)) -> Snapshot {
        let mut ctx = ContextAggregator::new();
        f(&mut ctx);
        ctx.snapshot(&LayerRegistry::standard())
    }

    #[test]
    fn training_answer_quotes_epochs_and_learning_rate() {
        let s = snap(|ctx| ctx.begin_training(7, 0.0025));
        let answer = fallback_response("How is TRAINING going?", &s);
        assert!(answer.contains("7"));
        assert!(answer.contains("0.0025"));
    }

    #[test]
    fn prediction_answer_uses_last_prediction() {
        let s = snap(|ctx| {
            ctx.observe(&EngineEvent::ProcessingComplete {
                predictions: vec![0.05, 0.05, 0.6, 0.2, 0.02, 0.02, 0.02, 0.02, 0.01, 0.01],
                predicted_class: 2,
                confidence: 0.6,
            })
        });
        let answer = fallback_response("what did it predict?", &s);
        assert!(answer.contains("digit 2 with 60.0% confidence"));
        assert!(answer.contains("second choice was 3 at 20.0%"));
    }

    #[test]
    fn prediction_answer_without_prediction() {
        let answer = fallback_response("prediction?", &snap(|_| {}));
        assert!(answer.starts_with("No prediction has been made yet"));
    }

    #[test]
    fn layer_answer_explains_focus_layer() {
        let reg = LayerRegistry::standard();
        let s = snap(|ctx| {
            ctx.observe(&EngineEvent::LayerProcessingStart {
                layer_index: 1,
                layer: reg.get(1).unwrap().clone(),
                progress: 14.0,
            })
        });
        let answer = fallback_response("What is this convolution doing?", &s);
        assert!(answer.contains("Conv1 layer (conv)"));
        assert!(answer.contains("edges and shapes"));
    }

    #[test]
    fn canvas_answer_depends_on_drawing() {
        assert!(fallback_response("what about the canvas", &snap(|_| {})).starts_with("The canvas is empty"));
        assert!(fallback_response("I will draw", &snap(|c| c.mark_drawing())).starts_with("There is a drawing"));
    }

    #[test]
    fn happening_answer_quotes_latest_status_when_idle() {
        let s = snap(|ctx| ctx.record_explanation(StatusKind::Success, "<strong>Training finished!</strong>"));
        let answer = fallback_response("what's happening?", &s);
        assert!(answer.ends_with("The last update was: Training finished!"));
    }

    #[test]
    fn default_answer_prefixes_capped_status() {
        let long = format!("<em>{}</em>", "x".repeat(500));
        let s = snap(|ctx| ctx.record_explanation(StatusKind::Info, long));
        let answer = fallback_response("hello there", &s);
        let first_line = answer.lines().next().unwrap();
        assert!(first_line.starts_with("Latest status: xxx"));
        assert!(!first_line.contains("<em>"));
        assert!(first_line.chars().count() <= "Latest status: ".len() + STATUS_EXCERPT_CAP);
        assert!(answer.contains("What would you like to know?"));
    }

    #[test]
    fn default_answer_without_status_is_plain_invitation() {
        let answer = fallback_response("hello", &snap(|_| {}));
        assert!(answer.starts_with("I'm here to help"));
    }
}
