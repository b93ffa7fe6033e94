pub mod error;
pub mod command;
pub mod event;
pub mod controller;
pub mod registry;

pub use error::SessionError;
pub use command::{ChatParams, Command, ProcessParams, TrainingParams, UserAction};
pub use event::ServerEvent;
pub use controller::{Activity, EngineFactory, SessionController, SessionServices};
pub use registry::{SessionId, SessionRegistry};
