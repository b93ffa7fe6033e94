use std::io::Cursor;

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::handlers;
use crate::state::SharedState;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn with_content_type(
    response: Response<Cursor<Vec<u8>>>,
    content_type: &str,
) -> Response<Cursor<Vec<u8>>> {
    match Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn bytes_response(status: u16, body: Vec<u8>, content_type: &str) -> Response<Cursor<Vec<u8>>> {
    let len = body.len();
    let response = Response::new(StatusCode(status), Vec::new(), Cursor::new(body), Some(len), None);
    with_content_type(response, content_type)
}

pub fn html_response(body: String) -> Response<Cursor<Vec<u8>>> {
    bytes_response(200, body.into_bytes(), "text/html; charset=utf-8")
}

pub fn asset_response(body: &str, content_type: &str) -> Response<Cursor<Vec<u8>>> {
    bytes_response(200, body.as_bytes().to_vec(), content_type)
}

/// Small JSON body for command replies.
#[derive(Debug, Serialize)]
pub struct JsonReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JsonReply {
    pub fn accepted() -> Self {
        JsonReply { status: Some("accepted"), error: None }
    }

    pub fn error(message: String) -> Self {
        JsonReply { status: None, error: Some(message) }
    }
}

pub fn json_response(status: u16, reply: JsonReply) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::to_vec(&reply).unwrap_or_else(|_| b"{}".to_vec());
    bytes_response(status, body, "application/json")
}

pub fn not_found() -> Response<Cursor<Vec<u8>>> {
    bytes_response(404, b"404 Not Found".to_vec(), "text/plain")
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches incoming requests to the appropriate handler.
///
/// The SSE channel takes ownership of the request to stream for the life of
/// the session; every other handler returns a response sent from here.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url    = request.url().to_owned();
    let path   = url.split('?').next().unwrap_or("").to_owned();

    // SSE is long-lived; the handler takes ownership and drives the stream loop.
    if method == Method::Get && path == "/channel" {
        handlers::channel::handle(request, state);
        return;
    }

    let response = match (&method, path.as_str()) {
        (Method::Get, "/") => handlers::page::handle_index(state),

        (Method::Get, p) if p.starts_with("/assets/") => {
            handlers::page::handle_asset(&p["/assets/".len()..]).unwrap_or_else(not_found)
        }

        (Method::Post, p) if p.starts_with("/channel/") => {
            let session_id = p["/channel/".len()..].to_owned();
            if session_id.is_empty() || session_id.contains('/') {
                not_found()
            } else {
                handlers::command::handle(&mut request, &session_id, state)
            }
        }

        _ => not_found(),
    };

    let _ = request.respond(response);
}
