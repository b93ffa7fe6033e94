use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;
use uuid::Uuid;

use crate::session::command::Command;
use crate::session::controller::{SessionController, SessionServices};
use crate::session::error::SessionError;
use crate::session::event::ServerEvent;

pub type SessionId = String;

/// All live sessions, keyed by the id handed out in `session-ready`.
pub struct SessionRegistry {
    services: SessionServices,
    sessions: Mutex<HashMap<SessionId, Arc<SessionController>>>,
}

impl SessionRegistry {
    pub fn new(services: SessionServices) -> Self {
        SessionRegistry { services, sessions: Mutex::new(HashMap::new()) }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<SessionController>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn services(&self) -> &SessionServices {
        &self.services
    }

    /// Creates a session under a fresh id and returns its event stream.
    pub fn open(&self) -> (Arc<SessionController>, mpsc::Receiver<ServerEvent>) {
        let id = Uuid::new_v4().to_string();
        let (session, events) = SessionController::open(id.clone(), &self.services);
        let session = Arc::new(session);
        let live = {
            let mut sessions = self.sessions();
            sessions.insert(id, session.clone());
            sessions.len()
        };
        info!(session = %session.id(), live, "channel opened");
        (session, events)
    }

    pub fn get(&self, id: &str) -> Option<Arc<SessionController>> {
        self.sessions().get(id).cloned()
    }

    /// Routes a command to its session.
    pub fn dispatch(&self, id: &str, command: Command) -> Result<(), SessionError> {
        let session = self
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_owned()))?;
        session.handle_command(command)
    }

    /// Forgets the session and shuts it down.  Returns false for unknown ids.
    pub fn close(&self, id: &str) -> bool {
        let (removed, live) = {
            let mut sessions = self.sessions();
            let removed = sessions.remove(id);
            (removed, sessions.len())
        };
        match removed {
            Some(session) => {
                session.shutdown();
                info!(session = %id, live, "channel closed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
