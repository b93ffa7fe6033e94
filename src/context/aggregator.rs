use chrono::Utc;
use serde_json::{json, Value};

use crate::context::bounded_log::BoundedLog;
use crate::context::snapshot::Snapshot;
use crate::context::state::{
    ChatEntry, ChatSender, ExplanationEntry, InteractionEntry, ProcessingState, StatusKind,
    TrainingState,
};
use crate::engine::{EngineEvent, PredictionResult};
use crate::layers::LayerRegistry;

pub const INTERACTION_LOG_CAP: usize = 50;
pub const EXPLANATION_LOG_CAP: usize = 20;
/// Chat turns kept in a snapshot; the full transcript stays in the session.
pub const SNAPSHOT_CHAT_TAIL: usize = 10;

/// Everything the chat assistant may need to know about one session.
///
/// Pure bookkeeping: it is fed engine events and user actions and hands out
/// [`Snapshot`]s.  One instance per session.
#[derive(Debug, Clone)]
pub struct ContextAggregator {
    has_drawing:     bool,
    last_prediction: Option<PredictionResult>,
    training:        TrainingState,
    processing:      ProcessingState,
    focus_layer:     Option<usize>,
    interactions:    BoundedLog<InteractionEntry>,
    opened_help:     Vec<String>,
    explanations:    BoundedLog<ExplanationEntry>,
    chat:            Vec<ChatEntry>,
}

impl Default for ContextAggregator {
    fn default() -> Self {
        ContextAggregator::new()
    }
}

impl ContextAggregator {
    pub fn new() -> Self {
        ContextAggregator {
            has_drawing:     false,
            last_prediction: None,
            training:        TrainingState::default(),
            processing:      ProcessingState::default(),
            focus_layer:     None,
            interactions:    BoundedLog::new(INTERACTION_LOG_CAP),
            opened_help:     Vec::new(),
            explanations:    BoundedLog::new(EXPLANATION_LOG_CAP),
            chat:            Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Engine progress
    // -----------------------------------------------------------------------

    /// Mirrors one engine event into the training / processing state.
    pub fn observe(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::TrainingEpochStart { epoch, total } => {
                self.training.is_training = true;
                self.training.epochs = *total;
                self.training.current_epoch = *epoch;
                self.training.current_batch = 0;
            }
            EngineEvent::TrainingStep { epoch, batch, loss, accuracy } => {
                self.training.current_epoch = *epoch;
                self.training.current_batch = *batch;
                self.training.last_loss = Some(loss.clone());
                self.training.last_accuracy = Some(accuracy.clone());
            }
            EngineEvent::WeightUpdate { .. } | EngineEvent::TrainingEpochComplete { .. } => {}
            EngineEvent::TrainingComplete { final_loss, final_accuracy, .. } => {
                self.training.is_training = false;
                self.training.last_loss = Some(final_loss.clone());
                self.training.last_accuracy = Some(final_accuracy.clone());
                self.record_interaction(
                    "training_completed",
                    json!({ "finalLoss": final_loss, "finalAccuracy": final_accuracy }),
                );
            }
            EngineEvent::ProcessingStart { .. } => {
                self.processing = ProcessingState { is_processing: true, ..ProcessingState::default() };
                self.focus_layer = None;
                self.record_interaction("processing_started", Value::Null);
            }
            EngineEvent::LayerProcessingStart { layer_index, .. } => {
                self.processing.current_layer_index = Some(*layer_index);
                self.focus_layer = Some(*layer_index);
            }
            EngineEvent::FilterActivation { .. } => {}
            EngineEvent::LayerProcessingComplete { layer_index, activation_data, .. } => {
                self.processing
                    .activations_by_layer
                    .insert(*layer_index, activation_data.clone());
            }
            EngineEvent::ProcessingComplete { predictions, predicted_class, confidence } => {
                self.processing.is_processing = false;
                self.last_prediction = Some(PredictionResult {
                    predicted_class: *predicted_class,
                    confidence: *confidence,
                    predictions: predictions.clone(),
                });
                self.record_interaction(
                    "processing_completed",
                    json!({ "predictedClass": predicted_class, "confidence": confidence }),
                );
            }
        }
    }

    /// Resets the training mirror for a new run.
    pub fn begin_training(&mut self, epochs: usize, learning_rate: f64) {
        self.training = TrainingState {
            is_training: true,
            epochs,
            learning_rate,
            ..TrainingState::default()
        };
        self.record_interaction(
            "training_started",
            json!({ "epochs": epochs, "learningRate": learning_rate }),
        );
    }

    pub fn training_failed(&mut self) {
        self.training.is_training = false;
    }

    pub fn processing_failed(&mut self) {
        self.processing.is_processing = false;
        self.focus_layer = None;
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    /// First stroke on an empty canvas.  Later strokes change nothing.
    pub fn mark_drawing(&mut self) {
        if !self.has_drawing {
            self.has_drawing = true;
            self.record_interaction("started_drawing", Value::Null);
        }
    }

    /// Empties the canvas and forgets the prediction.  Safe to repeat.
    pub fn clear_canvas(&mut self) {
        self.has_drawing = false;
        self.last_prediction = None;
        self.focus_layer = None;
        self.processing.activations_by_layer.clear();
        self.record_interaction("canvas_cleared", Value::Null);
    }

    pub fn record_upload(&mut self, file_name: Option<&str>) {
        self.has_drawing = true;
        self.record_interaction("image_uploaded", json!({ "fileName": file_name }));
    }

    /// Form values changed without starting a run.
    pub fn set_parameters(&mut self, epochs: Option<usize>, learning_rate: Option<f64>) {
        if let Some(e) = epochs {
            self.training.epochs = e;
        }
        if let Some(lr) = learning_rate {
            self.training.learning_rate = lr;
        }
        self.record_interaction(
            "parameters_changed",
            json!({ "epochs": epochs, "learningRate": learning_rate }),
        );
    }

    /// A help panel was opened.  Each topic is listed once, in first-open
    /// order; every opening is still logged as an interaction.
    pub fn open_help(&mut self, topic: &str) {
        if !self.opened_help.iter().any(|t| t == topic) {
            self.opened_help.push(topic.to_owned());
        }
        self.record_interaction("info_modal_opened", json!({ "topic": topic }));
    }

    pub fn record_interaction(&mut self, action: &str, data: Value) {
        self.interactions.push(InteractionEntry {
            timestamp: Utc::now(),
            action: action.to_owned(),
            data,
        });
    }

    pub fn record_explanation(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.explanations.push(ExplanationEntry {
            timestamp: Utc::now(),
            kind,
            text: text.into(),
        });
    }

    pub fn record_chat(&mut self, sender: ChatSender, text: impl Into<String>) {
        self.chat.push(ChatEntry {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn has_drawing(&self) -> bool {
        self.has_drawing
    }

    pub fn last_prediction(&self) -> Option<&PredictionResult> {
        self.last_prediction.as_ref()
    }

    pub fn training(&self) -> &TrainingState {
        &self.training
    }

    pub fn processing(&self) -> &ProcessingState {
        &self.processing
    }

    pub fn interactions(&self) -> &BoundedLog<InteractionEntry> {
        &self.interactions
    }

    pub fn explanations(&self) -> &BoundedLog<ExplanationEntry> {
        &self.explanations
    }

    pub fn chat_len(&self) -> usize {
        self.chat.len()
    }

    /// Immutable copy for the chat responder.
    pub fn snapshot(&self, layers: &LayerRegistry) -> Snapshot {
        Snapshot {
            has_drawing:     self.has_drawing,
            last_prediction: self.last_prediction.clone(),
            training:        self.training.clone(),
            processing:      self.processing.clone(),
            layers:          layers.as_slice().to_vec(),
            focus_layer:     self.focus_layer,
            interactions:    self.interactions.iter().cloned().collect(),
            opened_help:     self.opened_help.clone(),
            explanations:    self.explanations.iter().cloned().collect(),
            chat:            Snapshot::tail(&self.chat, SNAPSHOT_CHAT_TAIL).to_vec(),
            taken_at:        Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::render_system_prompt;
    use crate::engine::{Engine, InputPreparer, MockEngine, Pacing, SyntheticDigit};
    use crate::layers::LayerRegistry;

    #[test]
    fn interaction_log_is_capped_fifo() {
        let mut ctx = ContextAggregator::new();
        for i in 0..(INTERACTION_LOG_CAP + 7) {
            ctx.record_interaction(&format!("action_{}", i), Value::Null);
        }
        assert_eq!(ctx.interactions().len(), INTERACTION_LOG_CAP);
        let first = ctx.interactions().iter().next().unwrap();
        assert_eq!(first.action, "action_7");
        assert_eq!(ctx.interactions().latest().unwrap().action, format!("action_{}", INTERACTION_LOG_CAP + 6));
    }

    #[test]
    fn explanation_log_is_capped_fifo() {
        let mut ctx = ContextAggregator::new();
        for i in 0..45 {
            ctx.record_explanation(StatusKind::Info, format!("status {}", i));
        }
        assert_eq!(ctx.explanations().len(), EXPLANATION_LOG_CAP);
        assert_eq!(ctx.explanations().iter().next().unwrap().text, "status 25");
    }

    #[test]
    fn clear_canvas_is_idempotent() {
        let mut ctx = ContextAggregator::new();
        ctx.mark_drawing();
        ctx.observe(&EngineEvent::ProcessingComplete {
            predictions: vec![0.1; 10],
            predicted_class: 0,
            confidence: 0.1,
        });
        assert!(ctx.last_prediction().is_some());

        for _ in 0..2 {
            ctx.clear_canvas();
            assert!(!ctx.has_drawing());
            assert!(ctx.last_prediction().is_none());
        }
    }

    #[test]
    fn mark_drawing_logs_only_the_first_stroke() {
        let mut ctx = ContextAggregator::new();
        ctx.mark_drawing();
        ctx.mark_drawing();
        assert_eq!(ctx.interactions().len(), 1);
    }

    #[test]
    fn training_events_update_the_mirror() {
        let mut ctx = ContextAggregator::new();
        ctx.begin_training(3, 0.01);
        ctx.observe(&EngineEvent::TrainingEpochStart { epoch: 2, total: 3 });
        ctx.observe(&EngineEvent::TrainingStep {
            epoch: 2,
            batch: 5,
            loss: "0.4321".into(),
            accuracy: "0.6543".into(),
        });
        let t = ctx.training();
        assert!(t.is_training);
        assert_eq!((t.current_epoch, t.current_batch), (2, 5));
        assert_eq!(t.last_loss.as_deref(), Some("0.4321"));
        assert_eq!(t.learning_rate, 0.01);

        ctx.observe(&EngineEvent::TrainingComplete {
            final_loss: "0.0300".into(),
            final_accuracy: "0.9100".into(),
            message: String::new(),
        });
        assert!(!ctx.training().is_training);
    }

    #[test]
    fn processing_events_track_focus_and_prediction() {
        let reg = LayerRegistry::standard();
        let mut ctx = ContextAggregator::new();
        ctx.observe(&EngineEvent::ProcessingStart { total_layers: reg.len() });
        ctx.observe(&EngineEvent::LayerProcessingStart {
            layer_index: 2,
            layer: reg.get(2).unwrap().clone(),
            progress: 28.0,
        });
        let snap = ctx.snapshot(&reg);
        assert!(snap.processing.is_processing);
        assert_eq!(snap.focus().map(|l| l.name.as_str()), Some("Pool1"));

        ctx.observe(&EngineEvent::ProcessingComplete {
            predictions: vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            predicted_class: 1,
            confidence: 1.0,
        });
        let snap = ctx.snapshot(&reg);
        assert!(!snap.processing.is_processing);
        assert_eq!(snap.focus_layer, Some(2));
        assert_eq!(snap.last_prediction.unwrap().predicted_class, 1);

        ctx.observe(&EngineEvent::ProcessingStart { total_layers: reg.len() });
        assert_eq!(ctx.snapshot(&reg).focus_layer, None);
    }

    #[test]
    fn focus_stays_on_the_last_layer_after_a_full_run() {
        let reg = LayerRegistry::standard();
        let mut ctx = ContextAggregator::new();
        let mut sink: Vec<EngineEvent> = Vec::new();
        let mut engine = MockEngine::with_seed(reg.clone(), Pacing::none(), 3);
        let input = SyntheticDigit.prepare("data:image/png;base64,AAAA").unwrap();
        engine.process(&input, &mut sink).unwrap();
        for event in &sink {
            ctx.observe(event);
        }

        let snap = ctx.snapshot(&reg);
        assert_eq!(snap.focus_layer, Some(reg.len() - 1));
        let prompt = render_system_prompt(&snap);
        assert!(prompt.contains("(0-9) [current]"), "{}", prompt);
        assert!(prompt.contains("[completed]"));

        ctx.clear_canvas();
        assert_eq!(ctx.snapshot(&reg).focus_layer, None);
    }

    #[test]
    fn help_topics_are_listed_once() {
        let mut ctx = ContextAggregator::new();
        ctx.open_help("learning-rate");
        ctx.open_help("epochs");
        ctx.open_help("learning-rate");
        let snap = ctx.snapshot(&LayerRegistry::standard());
        assert_eq!(snap.opened_help, ["learning-rate", "epochs"]);
        assert_eq!(snap.interactions.len(), 3);
    }

    #[test]
    fn snapshot_keeps_only_recent_chat() {
        let mut ctx = ContextAggregator::new();
        for i in 0..15 {
            ctx.record_chat(ChatSender::User, format!("q{}", i));
        }
        let snap = ctx.snapshot(&LayerRegistry::standard());
        assert_eq!(snap.chat.len(), SNAPSHOT_CHAT_TAIL);
        assert_eq!(snap.chat[0].text, "q5");
        assert_eq!(ctx.chat_len(), 15);
    }
}
