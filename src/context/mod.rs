pub mod bounded_log;
pub mod state;
pub mod snapshot;
pub mod aggregator;

pub use bounded_log::BoundedLog;
pub use state::{
    ChatEntry, ChatSender, ExplanationEntry, InteractionEntry, ProcessingState, StatusKind,
    TrainingState,
};
pub use snapshot::Snapshot;
pub use aggregator::{ContextAggregator, EXPLANATION_LOG_CAP, INTERACTION_LOG_CAP};
