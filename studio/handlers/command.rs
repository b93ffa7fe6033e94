use std::io::{Cursor, Read};

use tiny_http::{Request, Response};
use tracing::debug;

use digit_lens::{Command, SessionError};

use crate::routes::{json_response, JsonReply};
use crate::state::SharedState;

/// Largest accepted command body.  Image data URLs dominate.
pub const MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;

/// `POST /channel/{id}`: feeds one JSON command into a session.
///
/// 202 once the command is accepted (its results arrive on the channel),
/// 400 for a malformed body or an empty chat message, 404 for an unknown
/// or closed session.
pub fn handle(request: &mut Request, session_id: &str, state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let mut body = String::new();
    if let Err(e) = request.as_reader().take(MAX_BODY_BYTES).read_to_string(&mut body) {
        return json_response(400, JsonReply::error(format!("unreadable body: {}", e)));
    }

    let result = Command::from_json(&body).and_then(|command| state.registry.dispatch(session_id, command));

    match result {
        Ok(()) => json_response(202, JsonReply::accepted()),
        Err(e) => {
            debug!(session = %session_id, error = %e, "command rejected");
            let status = match e {
                SessionError::Malformed(_) | SessionError::Chat(_) => 400,
                SessionError::NotFound(_) | SessionError::Closed => 404,
            };
            json_response(status, JsonReply::error(e.to_string()))
        }
    }
}
