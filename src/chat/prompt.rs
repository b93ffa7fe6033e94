use std::fmt::Write;

use crate::context::{ChatSender, Snapshot};
use crate::narration::strip_html;

pub const PROMPT_INTERACTION_TAIL: usize = 5;
pub const PROMPT_STATUS_TAIL: usize = 10;
pub const PROMPT_CHAT_TAIL: usize = 10;

const PREAMBLE: &str = "You are an assistant helping people understand a Convolutional Neural Network (CNN) \
visualization application. You can see everything that is happening in it in real time.";

const INSTRUCTIONS: &str = "INSTRUCTIONS:
- Answer questions about the CNN, its layers, the training process, or the current state
- Use the application state above to give specific answers; quote actual predictions and metrics
- If asked about layer processing, explain what is happening now or what just happened
- Explain complex ideas simply, with analogies
- Be encouraging and educational
- Keep answers concise (usually 2-3 sentences)";

/// Renders the system prompt that grounds the assistant in `snapshot`.
///
/// The output depends only on the snapshot, so identical snapshots give
/// identical prompts.
pub fn render_system_prompt(snapshot: &Snapshot) -> String {
    let mut p = String::with_capacity(2048);

    p.push_str(PREAMBLE);
    p.push_str("\n\nCURRENT APPLICATION STATE:\n");

    // ── Canvas ──────────────────────────────────────────────────────────────
    p.push_str("\nCANVAS STATUS:\n");
    let _ = writeln!(p, "- Has drawing: {}", snapshot.has_drawing);
    match &snapshot.last_prediction {
        Some(pred) => {
            let _ = writeln!(
                p,
                "- Last prediction: digit {} with {:.1}% confidence",
                pred.predicted_class,
                pred.confidence * 100.0
            );
        }
        None => p.push_str("- Last prediction: none yet\n"),
    }

    // ── Training ────────────────────────────────────────────────────────────
    let t = &snapshot.training;
    p.push_str("\nTRAINING STATUS:\n");
    let _ = writeln!(p, "- Currently training: {}", t.is_training);
    let _ = writeln!(p, "- Epochs setting: {}", t.epochs);
    let _ = writeln!(p, "- Learning rate: {}", t.learning_rate);
    if t.is_training {
        let _ = writeln!(p, "- Current epoch: {}", t.current_epoch);
        let _ = writeln!(p, "- Current batch: {}", t.current_batch);
        let _ = writeln!(p, "- Latest loss: {}", t.last_loss.as_deref().unwrap_or("n/a"));
        let _ = writeln!(p, "- Latest accuracy: {}", t.last_accuracy.as_deref().unwrap_or("n/a"));
    }

    // ── Processing ──────────────────────────────────────────────────────────
    let proc_state = &snapshot.processing;
    p.push_str("\nPROCESSING STATUS:\n");
    let _ = writeln!(p, "- Currently processing: {}", proc_state.is_processing);
    if let Some(index) = proc_state.current_layer_index {
        let name = snapshot.layers.get(index).map(|l| l.name.as_str()).unwrap_or("unknown");
        let _ = writeln!(p, "- Current layer: {} (index {})", name, index);
        let _ = writeln!(
            p,
            "- Layers with activations recorded: {}",
            proc_state.activations_by_layer.len()
        );
    }

    // ── Architecture ────────────────────────────────────────────────────────
    p.push_str("\nNETWORK ARCHITECTURE:\n");
    for (i, layer) in snapshot.layers.iter().enumerate() {
        let status = match snapshot.focus_layer {
            Some(f) if i < f  => " [completed]",
            Some(f) if i == f => " [current]",
            Some(_)           => " [pending]",
            None              => "",
        };
        let _ = writeln!(
            p,
            "- {}: {} layer, {}, {}{}",
            layer.name,
            layer.kind.tag(),
            layer.shape_label(),
            layer.description,
            status
        );
    }

    // ── Recent actions ──────────────────────────────────────────────────────
    let actions = Snapshot::tail(&snapshot.interactions, PROMPT_INTERACTION_TAIL);
    if !actions.is_empty() {
        p.push_str("\nRECENT USER ACTIONS:\n");
        for entry in actions {
            let _ = write!(p, "- {}: {}", entry.timestamp.format("%H:%M:%S"), entry.action);
            if has_payload(&entry.data) {
                let _ = write!(p, " ({})", entry.data);
            }
            p.push('\n');
        }
    }

    if !snapshot.opened_help.is_empty() {
        p.push_str("\nHELP TOPICS VIEWED:\n");
        let _ = writeln!(p, "- {}", snapshot.opened_help.join(", "));
    }

    let statuses = Snapshot::tail(&snapshot.explanations, PROMPT_STATUS_TAIL);
    if !statuses.is_empty() {
        p.push_str("\nRECENT LIVE STATUS MESSAGES:\n");
        for entry in statuses {
            let _ = writeln!(p, "- [{}] {}", entry.kind, strip_html(&entry.text));
        }
    }

    p.push('\n');
    p.push_str(INSTRUCTIONS);
    p.push_str("\n\nCONVERSATION HISTORY:");
    for turn in Snapshot::tail(&snapshot.chat, PROMPT_CHAT_TAIL) {
        let who = match turn.sender {
            ChatSender::User      => "User",
            ChatSender::Assistant => "Assistant",
        };
        let _ = write!(p, "\n{}: {}", who, turn.text);
    }

    p
}

fn has_payload(data: &serde_json::Value) -> bool {
    match data {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextAggregator, StatusKind};
    use crate::engine::EngineEvent;
    use crate::layers::LayerRegistry;

    fn snapshot_with(f: impl FnOnce(&mut ContextAggregator)) -> Snapshot {
        let mut ctx = ContextAggregator::new();
        f(&mut ctx);
        ctx.snapshot(&LayerRegistry::standard())
    }

    #[test]
    fn prompt_is_deterministic() {
        let snap = snapshot_with(|ctx| ctx.mark_drawing());
        assert_eq!(render_system_prompt(&snap), render_system_prompt(&snap));
    }

    #[test]
    fn training_details_only_while_training() {
        let idle = render_system_prompt(&snapshot_with(|_| {}));
        assert!(!idle.contains("Current epoch"));

        let busy = render_system_prompt(&snapshot_with(|ctx| {
            ctx.begin_training(4, 0.005);
            ctx.observe(&EngineEvent::TrainingStep {
                epoch: 1,
                batch: 2,
                loss: "1.2345".into(),
                accuracy: "0.3000".into(),
            });
        }));
        assert!(busy.contains("- Epochs setting: 4"));
        assert!(busy.contains("- Learning rate: 0.005"));
        assert!(busy.contains("- Current batch: 2"));
        assert!(busy.contains("- Latest loss: 1.2345"));
    }

    #[test]
    fn layers_are_annotated_relative_to_focus() {
        let reg = LayerRegistry::standard();
        let prompt = render_system_prompt(&snapshot_with(|ctx| {
            ctx.observe(&EngineEvent::LayerProcessingStart {
                layer_index: 3,
                layer: reg.get(3).unwrap().clone(),
                progress: 42.0,
            });
        }));
        assert!(prompt.contains("- Pool1: pool layer, 13×13×32, 2×2 max pooling [completed]"));
        assert!(prompt.contains("- Conv2: conv layer, 11×11×64, 64 filters, 3×3 kernel [current]"));
        assert!(prompt.contains("- Output: output layer, 10, 10 classes (0-9) [pending]"));
    }

    #[test]
    fn only_last_five_actions_are_listed() {
        let prompt = render_system_prompt(&snapshot_with(|ctx| {
            for i in 0..8 {
                ctx.record_interaction(&format!("act{}", i), serde_json::Value::Null);
            }
        }));
        assert!(!prompt.contains("act2"));
        for i in 3..8 {
            assert!(prompt.contains(&format!("act{}", i)));
        }
    }

    #[test]
    fn live_status_is_stripped_of_markup() {
        let prompt = render_system_prompt(&snapshot_with(|ctx| {
            ctx.record_explanation(StatusKind::Success, "<strong>Done</strong> now");
        }));
        assert!(prompt.contains("- [success] Done now"));
    }

    #[test]
    fn conversation_history_closes_the_prompt() {
        let prompt = render_system_prompt(&snapshot_with(|ctx| {
            ctx.record_chat(ChatSender::User, "what is a filter?");
            ctx.record_chat(ChatSender::Assistant, "A small pattern detector.");
        }));
        assert!(prompt.ends_with("User: what is a filter?\nAssistant: A small pattern detector."));
    }
}
