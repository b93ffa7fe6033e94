use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use tiny_http::Request;
use tracing::debug;

use crate::state::SharedState;
use crate::util::sse::{event_frame, format_sse_keepalive, write_sse, SSE_RESPONSE_HEAD};

/// Silence after which a keep-alive comment is written.  Writing is also how
/// a vanished client is noticed.
pub const KEEPALIVE_AFTER: Duration = Duration::from_secs(15);

/// `GET /channel`: opens a session and streams its events as SSE.
///
/// Consumes `request` (so it can call `into_writer`) and loops:
/// 1. Waits up to `KEEPALIVE_AFTER` for the next session event.
/// 2. On an event, writes `event: <name>\ndata: <json>\n\n`.
/// 3. On timeout, writes a `: ping` comment.
/// 4. When a write fails, the client has gone: the session is closed,
///    which cancels any running operation and disposes its engine.
pub fn handle(request: Request, state: SharedState) {
    let (session, events) = state.registry.open();
    let id = session.id().to_owned();
    drop(session);

    let mut writer = request.into_writer();

    if write_sse(&mut writer, SSE_RESPONSE_HEAD) {
        loop {
            let msg = match events.recv_timeout(KEEPALIVE_AFTER) {
                Ok(event) => match event_frame(&event) {
                    Some(frame) => frame,
                    None => continue,
                },
                Err(RecvTimeoutError::Timeout) => format_sse_keepalive().to_owned(),
                Err(RecvTimeoutError::Disconnected) => break,
            };
            if !write_sse(&mut writer, &msg) {
                debug!(session = %id, "client went away");
                break;
            }
        }
    }

    state.registry.close(&id);
}
