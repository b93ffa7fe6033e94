use std::io::Cursor;

use tiny_http::Response;

use crate::render::{render_index, APP_JS, STYLE_CSS};
use crate::routes::{asset_response, html_response};
use crate::state::SharedState;

/// `GET /`: the application page.
pub fn handle_index(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    html_response(render_index(&state))
}

/// `GET /assets/{name}`: the page's script and stylesheet.
pub fn handle_asset(name: &str) -> Option<Response<Cursor<Vec<u8>>>> {
    match name {
        "app.js"    => Some(asset_response(APP_JS, "application/javascript; charset=utf-8")),
        "style.css" => Some(asset_response(STYLE_CSS, "text/css; charset=utf-8")),
        _ => None,
    }
}
