use std::sync::Arc;

use digit_lens::chat::{fallback_response, render_system_prompt, validate_message, Unavailable};
use digit_lens::context::{ContextAggregator, StatusKind};
use digit_lens::session::ChatParams;
use digit_lens::{
    ChatError, ChatResponder, Command, CompletionService, EngineEvent, LayerRegistry, Pacing,
    ServerEvent, SessionController, SessionError, SessionServices, Snapshot,
};

/// Stands in for an unreachable completion endpoint.
struct Down;

impl CompletionService for Down {
    fn complete(&self, _system: &str, _user: &str) -> Result<String, ChatError> {
        Err(ChatError::Transport("connection refused".into()))
    }
}

fn training_snapshot(epochs: usize, learning_rate: f64) -> Snapshot {
    let mut ctx = ContextAggregator::new();
    ctx.begin_training(epochs, learning_rate);
    ctx.observe(&EngineEvent::TrainingEpochStart { epoch: 1, total: epochs });
    ctx.snapshot(&LayerRegistry::standard())
}

#[test]
fn failing_service_falls_back_with_training_settings() {
    let responder = ChatResponder::new(Box::new(Down));
    let snap = training_snapshot(3, 0.001);

    let reply = responder.respond("Is it still training?", &snap);
    assert!(reply.contains("3 epochs"), "{}", reply);
    assert!(reply.contains("0.001"), "{}", reply);
    assert_eq!(reply, fallback_response("Is it still training?", &snap));
}

#[test]
fn missing_credential_uses_the_same_fallback() {
    let snap = training_snapshot(8, 0.01);
    let offline = ChatResponder::new(Box::new(Unavailable)).respond("train?", &snap);
    let down = ChatResponder::new(Box::new(Down)).respond("train?", &snap);
    assert_eq!(offline, down);
}

#[test]
fn blank_message_is_rejected_before_the_service() {
    assert_eq!(validate_message(""), Err(ChatError::EmptyMessage));
    assert_eq!(validate_message(" \t\n"), Err(ChatError::EmptyMessage));

    let services = SessionServices::mock(
        LayerRegistry::standard(),
        Pacing::none(),
        ChatResponder::new(Box::new(Down)),
    );
    let (session, rx) = SessionController::open("blank".into(), &services);
    let err = session
        .handle_command(Command::ChatMessage(ChatParams { message: "   ".into(), context: None }))
        .unwrap_err();
    assert!(matches!(err, SessionError::Chat(ChatError::EmptyMessage)));

    let events: Vec<ServerEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 1, "only session-ready expected: {:?}", events);
    assert!(session.snapshot().chat.is_empty());
}

#[test]
fn client_supplied_context_drives_the_answer() {
    let services = SessionServices::mock(
        LayerRegistry::standard(),
        Pacing::none(),
        ChatResponder::new(Box::new(Unavailable)),
    );
    let (session, rx) = SessionController::open("ctx".into(), &services);

    let client_view = Snapshot { has_drawing: true, ..Snapshot::default() };
    session
        .handle_command(Command::ChatMessage(ChatParams {
            message: "what about my canvas?".into(),
            context: Some(client_view),
        }))
        .unwrap();

    let reply = rx
        .try_iter()
        .find_map(|e| match e {
            ServerEvent::ChatResponse { response, .. } => response,
            _ => None,
        })
        .unwrap();
    assert!(reply.starts_with("There is a drawing"), "{}", reply);
}

#[test]
fn prompt_reflects_live_state_and_is_stable() {
    let mut ctx = ContextAggregator::new();
    ctx.mark_drawing();
    ctx.open_help("learning-rate");
    ctx.record_explanation(StatusKind::Processing, "<strong>Pooling layer</strong> is shrinking things");
    let snap = ctx.snapshot(&LayerRegistry::standard());

    let prompt = render_system_prompt(&snap);
    assert!(prompt.contains("- Has drawing: true"));
    assert!(prompt.contains("HELP TOPICS VIEWED:\n- learning-rate"));
    assert!(prompt.contains("[processing] Pooling layer is shrinking things"));
    assert!(!prompt.contains("<strong>"));
    assert_eq!(prompt, render_system_prompt(&snap));
}

#[test]
fn responder_is_shareable_across_threads() {
    let responder = Arc::new(ChatResponder::new(Box::new(Unavailable)));
    let snap = Arc::new(training_snapshot(2, 0.005));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (r, s) = (responder.clone(), snap.clone());
            std::thread::spawn(move || r.respond("training status?", &s))
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap().contains("0.005"));
    }
}
