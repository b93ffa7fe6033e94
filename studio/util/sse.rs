use std::io::Write;

use digit_lens::ServerEvent;
use tracing::warn;

// ---------------------------------------------------------------------------
// SSE framing helpers
// ---------------------------------------------------------------------------

/// Raw HTTP head for an SSE stream.  tiny_http's `into_writer()` hands us the
/// bare connection, so the status line and headers are written by hand.
pub const SSE_RESPONSE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
                                     Content-Type: text/event-stream\r\n\
                                     Cache-Control: no-cache\r\n\
                                     Connection: keep-alive\r\n\
                                     X-Accel-Buffering: no\r\n\
                                     \r\n";

/// Formats a named SSE event with a JSON data payload.
///
/// Output format:
/// ```text
/// event: <name>\n
/// data: <json>\n
/// \n
/// ```
pub fn format_sse_event(event_name: &str, json_data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event_name, json_data)
}

/// Keep-alive comment.  EventSource clients ignore lines starting with `:`.
pub fn format_sse_keepalive() -> &'static str {
    ": ping\n\n"
}

/// Frames a server event, or `None` if its payload fails to serialize.
pub fn event_frame(event: &ServerEvent) -> Option<String> {
    match event.payload() {
        Ok(data) => Some(format_sse_event(event.name(), &data.to_string())),
        Err(e) => {
            warn!(event = event.name(), error = %e, "dropping unserializable event");
            None
        }
    }
}

/// Writes one SSE message and flushes.  Returns `false` once the client is
/// gone.
pub fn write_sse<W: Write>(writer: &mut W, msg: &str) -> bool {
    writer.write_all(msg.as_bytes()).is_ok() && writer.flush().is_ok()
}
