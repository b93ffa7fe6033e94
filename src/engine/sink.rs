use std::sync::mpsc;

use crate::engine::error::EngineError;
use crate::engine::events::EngineEvent;

/// Receives progress events from an engine run.
///
/// `emit` failing aborts the run; `is_cancelled` is polled at every
/// suspension point (between epochs, batches, layers and filters).
pub trait EventSink {
    fn emit(&mut self, event: EngineEvent) -> Result<(), EngineError>;

    fn is_cancelled(&self) -> bool {
        false
    }

    /// Returns `Err(Cancelled)` once the consumer has asked the run to stop.
    fn checkpoint(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Collects everything; handy for tests and for replaying a run.
impl EventSink for Vec<EngineEvent> {
    fn emit(&mut self, event: EngineEvent) -> Result<(), EngineError> {
        self.push(event);
        Ok(())
    }
}

/// Forwards into a channel.  A dropped receiver stops the run, the same
/// way a closed progress channel ends a training loop.
impl EventSink for mpsc::Sender<EngineEvent> {
    fn emit(&mut self, event: EngineEvent) -> Result<(), EngineError> {
        self.send(event).map_err(|_| EngineError::Disconnected)
    }
}
