/// Template renderer for the studio page.
///
/// The page is a single HTML template (`studio/assets/index.html`) with
/// placeholder tokens like `{{TOKEN}}`, loaded at compile time.  Tokens that
/// are not filled here are blanked so raw `{{TOKEN}}` never reaches the
/// browser.

use digit_lens::engine::train_config::{DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE, MAX_EPOCHS};

use crate::state::StudioState;

const TEMPLATE: &str = include_str!("assets/index.html");

pub const APP_JS: &str = include_str!("assets/app.js");
pub const STYLE_CSS: &str = include_str!("assets/style.css");

/// Renders the application page with the server's defaults injected.
pub fn render_index(state: &StudioState) -> String {
    let mut html = TEMPLATE.to_owned();

    html = html.replace("{{DEFAULT_EPOCHS}}", &DEFAULT_EPOCHS.to_string());
    html = html.replace("{{MAX_EPOCHS}}",     &MAX_EPOCHS.to_string());
    html = html.replace("{{DEFAULT_LR}}",     &DEFAULT_LEARNING_RATE.to_string());
    html = html.replace("{{LAYER_COUNT}}",    &state.registry.services().layers.len().to_string());
    html = html.replace("{{CHAT_MODE}}",      if state.chat_online() { "online" } else { "offline" });

    blank_remaining(html)
}

/// Replaces any `{{UPPERCASE_TOKEN}}` that wasn't already substituted with an
/// empty string.
fn blank_remaining(mut html: String) -> String {
    while let Some(start) = html.find("{{") {
        if let Some(end) = html[start..].find("}}") {
            let abs_end = start + end + 2;
            html.replace_range(start..abs_end, "");
        } else {
            break;
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfilled_tokens_are_blanked() {
        assert_eq!(blank_remaining("a{{X}}b{{Y_Z}}c".into()), "abc");
    }

    #[test]
    fn unterminated_token_is_left_alone() {
        assert_eq!(blank_remaining("a{{X".into()), "a{{X");
    }

    #[test]
    fn template_has_the_injected_tokens() {
        for token in ["{{DEFAULT_EPOCHS}}", "{{DEFAULT_LR}}", "{{CHAT_MODE}}"] {
            assert!(TEMPLATE.contains(token), "missing {}", token);
        }
    }
}
