pub mod layers;
pub mod engine;
pub mod context;
pub mod narration;
pub mod chat;
pub mod session;
pub mod config;

// Convenience re-exports
pub use layers::{LayerDescriptor, LayerKind, LayerRegistry};
pub use engine::{Engine, EngineError, EngineEvent, EventSink, MockEngine, Pacing, TrainRequest};
pub use context::{ContextAggregator, Snapshot};
pub use chat::{ChatError, ChatResponder, CompletionService};
pub use session::{Command, ServerEvent, SessionController, SessionError, SessionRegistry, SessionServices};
pub use config::{ChatConfig, ConfigError, ServerConfig};
