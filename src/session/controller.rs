use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::chat::{validate_message, ChatResponder};
use crate::context::{ChatSender, ContextAggregator, Snapshot};
use crate::engine::{
    Engine, EngineError, EngineEvent, EventSink, InputPreparer, MockEngine, Pacing,
    ParameterUpdate, SyntheticDigit, TrainRequest,
};
use crate::layers::LayerRegistry;
use crate::narration::{self, Narration};
use crate::session::command::{ChatParams, Command, ProcessParams, TrainingParams, UserAction};
use crate::session::error::SessionError;
use crate::session::event::ServerEvent;

/// Builds a fresh engine for a session (and again after an engine panic).
pub type EngineFactory = Arc<dyn Fn(&LayerRegistry) -> Box<dyn Engine> + Send + Sync>;

const CHAT_FAILURE_REPLY: &str = "Sorry, I couldn't process your question right now.";

// ---------------------------------------------------------------------------
// Services shared by every session
// ---------------------------------------------------------------------------

/// Process-wide collaborators handed to each new session.
#[derive(Clone)]
pub struct SessionServices {
    pub layers:    LayerRegistry,
    pub engines:   EngineFactory,
    pub preparer:  Arc<dyn InputPreparer>,
    pub responder: Arc<ChatResponder>,
}

impl SessionServices {
    pub fn new(
        layers: LayerRegistry,
        engines: EngineFactory,
        preparer: Arc<dyn InputPreparer>,
        responder: ChatResponder,
    ) -> Self {
        SessionServices { layers, engines, preparer, responder: Arc::new(responder) }
    }

    /// Mock engine with the given pacing and the synthetic input preparer.
    pub fn mock(layers: LayerRegistry, pacing: Pacing, responder: ChatResponder) -> Self {
        let engines: EngineFactory = Arc::new(move |layers: &LayerRegistry| {
            Box::new(MockEngine::new(layers.clone(), pacing)) as Box<dyn Engine>
        });
        SessionServices::new(layers, engines, Arc::new(SyntheticDigit), responder)
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// What the session's engine is doing.  Only one long-running operation is
/// allowed at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Training,
    Processing,
}

enum Job {
    Train(TrainRequest),
    Process(String),
    UpdateParameters(ParameterUpdate),
}

/// State visible to both the request threads and the worker.
struct Shared {
    id:        String,
    layers:    LayerRegistry,
    context:   Mutex<ContextAggregator>,
    activity:  Mutex<Activity>,
    cancelled: AtomicBool,
    outbound:  mpsc::Sender<ServerEvent>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn context(&self) -> MutexGuard<'_, ContextAggregator> {
        lock(&self.context)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sends outside an engine run.  A closed channel only means the client
    /// is gone, which the registry handles.
    fn send(&self, event: ServerEvent) {
        if self.outbound.send(event).is_err() {
            debug!(session = %self.id, "event dropped; channel closed");
        }
    }

    /// Logs a live-status line and pushes it to the client.
    fn narrate(&self, narration: Narration) {
        self.context().record_explanation(narration.kind, narration.text.clone());
        self.send(narration.into());
    }

    /// Moves Idle → `next`, or reports what is already running.
    fn try_begin(&self, next: Activity) -> Result<(), Activity> {
        let mut activity = lock(&self.activity);
        match *activity {
            Activity::Idle => {
                *activity = next;
                Ok(())
            }
            busy => Err(busy),
        }
    }

    fn finish(&self) {
        *lock(&self.activity) = Activity::Idle;
    }
}

fn busy_message(current: Activity) -> String {
    match current {
        Activity::Training   => "busy: training is already in progress".to_owned(),
        Activity::Processing => "busy: an image is still being processed".to_owned(),
        Activity::Idle       => "busy".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// One client's session: its context, its engine worker and its outbound
/// event channel.
///
/// Long-running work (training, processing, parameter changes) is queued to
/// a worker thread that owns the engine, so events arrive in the order the
/// engine emits them.  Chat and UI actions are handled on the caller's
/// thread and never wait for the engine.
pub struct SessionController {
    shared:    Arc<Shared>,
    responder: Arc<ChatResponder>,
    jobs:      Mutex<Option<mpsc::Sender<Job>>>,
    worker:    Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Starts a session.  The returned receiver yields `session-ready` first,
    /// then every event the session produces until it is shut down.
    pub fn open(id: String, services: &SessionServices) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (out_tx, out_rx) = mpsc::channel();
        let _ = out_tx.send(ServerEvent::SessionReady {
            session_id: id.clone(),
            layers:     services.layers.as_slice().to_vec(),
        });

        let shared = Arc::new(Shared {
            id,
            layers:    services.layers.clone(),
            context:   Mutex::new(ContextAggregator::new()),
            activity:  Mutex::new(Activity::Idle),
            cancelled: AtomicBool::new(false),
            outbound:  out_tx,
        });

        let (job_tx, job_rx) = mpsc::channel();
        let worker = Worker {
            shared:   shared.clone(),
            engine:   (services.engines)(&services.layers),
            engines:  services.engines.clone(),
            preparer: services.preparer.clone(),
        };
        let handle = thread::spawn(move || worker.run(job_rx));

        info!(session = %shared.id, "session opened");
        let controller = SessionController {
            shared,
            responder: services.responder.clone(),
            jobs:      Mutex::new(Some(job_tx)),
            worker:    Mutex::new(Some(handle)),
        };
        (controller, out_rx)
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn activity(&self) -> Activity {
        *lock(&self.shared.activity)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.context().snapshot(&self.shared.layers)
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.jobs).is_none()
    }

    /// Applies one client command.
    ///
    /// Only malformed input and a closed session are errors; anything that
    /// goes wrong inside the engine is reported as an event instead.
    pub fn handle_command(&self, command: Command) -> Result<(), SessionError> {
        debug!(session = %self.shared.id, command = command.name(), "command received");
        match command {
            Command::StartTraining(params)   => self.start_training(params),
            Command::ProcessImage(params)    => self.process_image(params),
            Command::UpdateParameters(update) => self.submit(Job::UpdateParameters(update)),
            Command::ChatMessage(params)     => self.chat(params),
            Command::UserAction(action)      => {
                self.user_action(action);
                Ok(())
            }
        }
    }

    fn start_training(&self, params: TrainingParams) -> Result<(), SessionError> {
        let request = match TrainRequest::from_parts(params.epochs, params.batch_size, params.learning_rate) {
            Ok(request) => request,
            Err(e) => {
                self.shared.send(ServerEvent::TrainingError { message: e.to_string() });
                return Ok(());
            }
        };
        if let Err(current) = self.shared.try_begin(Activity::Training) {
            self.shared.send(ServerEvent::TrainingError { message: busy_message(current) });
            return Ok(());
        }

        self.shared.context().begin_training(request.epochs, request.learning_rate);
        self.shared.narrate(narration::training_requested(request.epochs, request.learning_rate));
        self.submit(Job::Train(request))
    }

    fn process_image(&self, params: ProcessParams) -> Result<(), SessionError> {
        if let Err(current) = self.shared.try_begin(Activity::Processing) {
            self.shared.send(ServerEvent::ProcessingError { message: busy_message(current) });
            return Ok(());
        }
        self.shared.narrate(narration::processing_requested());
        self.submit(Job::Process(params.image_data_url))
    }

    fn chat(&self, params: ChatParams) -> Result<(), SessionError> {
        let message = validate_message(&params.message)?.to_owned();

        let snapshot = {
            let mut ctx = self.shared.context();
            ctx.record_chat(ChatSender::User, message.clone());
            ctx.record_interaction("chat_message_sent", json!({ "message": message }));
            match params.context {
                Some(client_view) => client_view,
                None => ctx.snapshot(&self.shared.layers),
            }
        };

        let responder = &self.responder;
        let event = match panic::catch_unwind(AssertUnwindSafe(|| responder.respond(&message, &snapshot))) {
            Ok(reply) => {
                self.shared.context().record_chat(ChatSender::Assistant, reply.clone());
                ServerEvent::reply(reply)
            }
            Err(payload) => {
                error!(session = %self.shared.id, reason = %panic_message(&payload), "chat responder panicked");
                ServerEvent::reply_error(CHAT_FAILURE_REPLY.to_owned())
            }
        };
        self.shared.send(event);
        Ok(())
    }

    fn user_action(&self, action: UserAction) {
        let narration = {
            let mut ctx = self.shared.context();
            match action {
                UserAction::StartedDrawing => {
                    ctx.mark_drawing();
                    None
                }
                UserAction::CanvasCleared => {
                    ctx.clear_canvas();
                    Some(narration::canvas_cleared())
                }
                UserAction::ImageUploaded { file_name } => {
                    ctx.record_upload(file_name.as_deref());
                    Some(narration::image_uploaded())
                }
                UserAction::ParametersChanged { epochs, learning_rate } => {
                    ctx.set_parameters(epochs, learning_rate);
                    None
                }
                UserAction::HelpOpened { topic } => {
                    ctx.open_help(&topic);
                    None
                }
            }
        };
        if let Some(n) = narration {
            self.shared.narrate(n);
        }
    }

    fn submit(&self, job: Job) -> Result<(), SessionError> {
        let sent = match lock(&self.jobs).as_ref() {
            Some(jobs) => jobs.send(job).is_ok(),
            None => false,
        };
        if sent {
            Ok(())
        } else {
            self.shared.finish();
            Err(SessionError::Closed)
        }
    }

    /// Cancels any running operation and closes the job queue.  The worker
    /// disposes the engine and exits on its own; see [`join`](Self::join).
    pub fn shutdown(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
        if lock(&self.jobs).take().is_some() {
            info!(session = %self.shared.id, "session shutting down");
        }
    }

    /// Waits for the worker to finish.  Only meaningful after `shutdown`.
    pub fn join(&self) {
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(session = %self.shared.id, "session worker panicked");
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    shared:   Arc<Shared>,
    engine:   Box<dyn Engine>,
    engines:  EngineFactory,
    preparer: Arc<dyn InputPreparer>,
}

impl Worker {
    fn run(mut self, jobs: mpsc::Receiver<Job>) {
        for job in jobs.iter() {
            if self.shared.is_cancelled() {
                break;
            }
            match job {
                Job::Train(request)          => self.train(request),
                Job::Process(data_url)       => self.process(&data_url),
                Job::UpdateParameters(update) => self.update_parameters(update),
            }
        }
        self.engine.dispose();
        info!(session = %self.shared.id, "engine disposed");
    }

    fn train(&mut self, request: TrainRequest) {
        info!(
            session = %self.shared.id,
            epochs = request.epochs,
            batch_size = request.batch_size,
            learning_rate = request.learning_rate,
            "training started"
        );
        let (result, released) = self.guarded(|engine, sink| engine.train(&request, sink));
        match result {
            Ok(summary) => info!(
                session = %self.shared.id,
                epochs = summary.epochs_completed,
                final_loss = %summary.final_loss,
                "training finished"
            ),
            Err(e) if e.is_disconnect() => debug!(session = %self.shared.id, "training stopped: {}", e),
            Err(e) => {
                error!(session = %self.shared.id, error = %e, "training failed");
                self.shared.context().training_failed();
                self.shared.send(ServerEvent::TrainingError { message: e.to_string() });
                self.shared.narrate(narration::failure("Training", &e.to_string()));
            }
        }
        if !released {
            self.shared.finish();
        }
    }

    fn process(&mut self, data_url: &str) {
        let (result, released) = match self.preparer.prepare(data_url) {
            Ok(input) => self.guarded(|engine, sink| engine.process(&input, sink)),
            Err(e) => (Err(e), false),
        };
        match result {
            Ok(prediction) => info!(
                session = %self.shared.id,
                predicted_class = prediction.predicted_class,
                confidence = prediction.confidence,
                "processing finished"
            ),
            Err(e) if e.is_disconnect() => debug!(session = %self.shared.id, "processing stopped: {}", e),
            Err(e) => {
                error!(session = %self.shared.id, error = %e, "processing failed");
                self.shared.context().processing_failed();
                self.shared.send(ServerEvent::ProcessingError { message: e.to_string() });
                self.shared.narrate(narration::failure("Processing", &e.to_string()));
            }
        }
        if !released {
            self.shared.finish();
        }
    }

    fn update_parameters(&mut self, update: ParameterUpdate) {
        match self.engine.update_parameters(&update) {
            Ok(()) => {
                let learning_rate = self.engine.learning_rate();
                self.shared.context().set_parameters(None, Some(learning_rate));
                self.shared.send(ServerEvent::ParameterUpdateConfirmed { learning_rate });
            }
            Err(e) => {
                warn!(session = %self.shared.id, error = %e, "parameter update rejected");
                self.shared.send(ServerEvent::ParameterUpdateError { message: e.to_string() });
            }
        }
    }

    /// Runs `op` against the engine, turning a panic into an error and
    /// replacing the engine so the session stays usable.
    ///
    /// The flag is true when the session already went idle on the run's
    /// terminal event.
    fn guarded<T>(
        &mut self,
        op: impl FnOnce(&mut dyn Engine, &mut dyn EventSink) -> Result<T, EngineError>,
    ) -> (Result<T, EngineError>, bool) {
        let mut sink = SessionSink { shared: &self.shared, released: false };
        let engine = self.engine.as_mut();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| op(engine, &mut sink)));
        let released = sink.released;
        match outcome {
            Ok(result) => (result, released),
            Err(payload) => {
                let reason = panic_message(&payload);
                warn!(session = %self.shared.id, %reason, "engine panicked; starting a fresh one");
                self.engine = (self.engines)(&self.shared.layers);
                (Err(EngineError::Panicked(reason)), released)
            }
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Mirrors engine events into the session context and forwards them, each
/// followed by its live-status narration when it has one.
///
/// A terminal event returns the session to Idle before it is forwarded, so a
/// client may start the next run as soon as it sees the completion.
struct SessionSink<'a> {
    shared:   &'a Shared,
    released: bool,
}

impl EventSink for SessionSink<'_> {
    fn emit(&mut self, event: EngineEvent) -> Result<(), EngineError> {
        self.checkpoint()?;

        let narration = narration::for_event(&event);
        {
            let mut ctx = self.shared.context();
            ctx.observe(&event);
            if let Some(n) = &narration {
                ctx.record_explanation(n.kind, n.text.clone());
            }
        }

        if matches!(event, EngineEvent::TrainingComplete { .. } | EngineEvent::ProcessingComplete { .. }) {
            self.shared.finish();
            self.released = true;
        }

        let outbound = &self.shared.outbound;
        outbound.send(event.into()).map_err(|_| EngineError::Disconnected)?;
        if let Some(n) = narration {
            outbound.send(n.into()).map_err(|_| EngineError::Disconnected)?;
        }
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::chat::Unavailable;

    fn services() -> SessionServices {
        SessionServices::mock(
            LayerRegistry::standard(),
            Pacing::none(),
            ChatResponder::new(Box::new(Unavailable)),
        )
    }

    fn next(rx: &mpsc::Receiver<ServerEvent>) -> ServerEvent {
        rx.recv_timeout(Duration::from_secs(5)).expect("event")
    }

    #[test]
    fn first_event_is_session_ready() {
        let (session, rx) = SessionController::open("abc".into(), &services());
        match next(&rx) {
            ServerEvent::SessionReady { session_id, layers } => {
                assert_eq!(session_id, "abc");
                assert_eq!(layers.len(), 7);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.activity(), Activity::Idle);
    }

    #[test]
    fn busy_session_rejects_second_operation() {
        let (session, rx) = SessionController::open("s".into(), &services());
        *lock(&session.shared.activity) = Activity::Training;

        session
            .handle_command(Command::ProcessImage(ProcessParams {
                image_data_url: "data:image/png;base64,AA".into(),
            }))
            .unwrap();

        let _ready = next(&rx);
        match next(&rx) {
            ServerEvent::ProcessingError { message } => assert!(message.starts_with("busy")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn invalid_training_request_reports_error() {
        let (session, rx) = SessionController::open("s".into(), &services());
        session
            .handle_command(Command::StartTraining(TrainingParams {
                epochs: Some(1000),
                ..TrainingParams::default()
            }))
            .unwrap();
        let _ready = next(&rx);
        assert!(matches!(next(&rx), ServerEvent::TrainingError { .. }));
        assert_eq!(session.activity(), Activity::Idle);
    }

    #[test]
    fn blank_chat_is_an_error_without_events() {
        let (session, rx) = SessionController::open("s".into(), &services());
        let err = session
            .handle_command(Command::ChatMessage(ChatParams { message: "   ".into(), context: None }))
            .unwrap_err();
        assert!(matches!(err, SessionError::Chat(_)));
        let _ready = next(&rx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn chat_send_is_logged_as_an_interaction() {
        let (session, rx) = SessionController::open("s".into(), &services());
        session
            .handle_command(Command::ChatMessage(ChatParams { message: " hello ".into(), context: None }))
            .unwrap();

        let snap = session.snapshot();
        let sent: Vec<_> = snap
            .interactions
            .iter()
            .filter(|e| e.action == "chat_message_sent")
            .collect();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data["message"], "hello");

        let _ready = next(&rx);
        assert!(matches!(next(&rx), ServerEvent::ChatResponse { .. }));
    }

    #[test]
    fn terminal_event_arrives_after_the_session_is_idle() {
        let (session, rx) = SessionController::open("s".into(), &services());
        session
            .handle_command(Command::ProcessImage(ProcessParams {
                image_data_url: "data:image/png;base64,AA".into(),
            }))
            .unwrap();
        loop {
            if let ServerEvent::Engine(EngineEvent::ProcessingComplete { .. }) = next(&rx) {
                break;
            }
        }
        assert_eq!(session.activity(), Activity::Idle);
    }

    #[test]
    fn commands_after_shutdown_fail() {
        let (session, _rx) = SessionController::open("s".into(), &services());
        session.shutdown();
        session.join();
        assert!(session.is_closed());
        let err = session
            .handle_command(Command::UpdateParameters(ParameterUpdate { learning_rate: Some(0.01) }))
            .unwrap_err();
        assert!(matches!(err, SessionError::Closed));
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let a: Box<dyn Any + Send> = Box::new("boom");
        let b: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&a), "boom");
        assert_eq!(panic_message(&b), "bang");
    }
}
