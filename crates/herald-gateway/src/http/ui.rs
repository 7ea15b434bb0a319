use axum::{extract::State, response::Html};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

static INDEX_HTML: &str = include_str!("../../static/index.html");

/// Placeholder replaced with the escaped current message.
const MESSAGE_SLOT: &str = "{{message}}";

/// Status page template: an external file if configured and readable,
/// the embedded page otherwise.
pub struct PageTemplate {
    source: String,
}

impl PageTemplate {
    pub fn load(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::embedded();
        };
        match Self::from_file(path) {
            Ok(page) => {
                info!(path = %path, "using external page template");
                page
            }
            Err(e) => {
                warn!(
                    path = %path,
                    error = %e,
                    code = e.code(),
                    "page template unreadable, using embedded page"
                );
                Self::embedded()
            }
        }
    }

    /// Read a template from disk.
    pub fn from_file(path: &str) -> herald_core::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(Self { source })
    }

    pub fn embedded() -> Self {
        Self {
            source: INDEX_HTML.to_string(),
        }
    }

    pub fn render(&self, message: &str) -> String {
        self.source.replace(MESSAGE_SLOT, &escape_html(message))
    }
}

/// Serve the status page at `GET /`.
pub async fn ui_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.page.render(&state.hub.current()))
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
