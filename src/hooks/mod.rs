//! Session hooks.
//!
//! Handlers for the host runtime's session lifecycle events. Each handler
//! takes the event's JSON payload and returns a JSON response.
//!
//! | Event | Handler | Response |
//! |-------|---------|----------|
//! | Session start | [`SessionStartHandler`] | `hookSpecificOutput.additionalContext` with the knowledge digest |
//! | Session end | [`SessionEndHandler`] | `{"stored": n}` |
//!
//! Example session start response:
//!
//! ```json
//! {
//!   "hookSpecificOutput": {
//!     "hookEventName": "SessionStart",
//!     "additionalContext": "# Knowledge Context\n\n..."
//!   }
//! }
//! ```
//!
//! A session start whose query fails logs a warning and returns `{}` so the
//! host session proceeds without injected knowledge.

mod session_end;
mod session_start;

pub use session_end::{SessionEndHandler, SessionEndInput, SessionLearning};
pub use session_start::{SessionStartHandler, SessionStartInput};

use crate::{Error, Result};
use serde::de::DeserializeOwned;

/// Trait for hook handlers.
pub trait HookHandler: Send + Sync {
    /// The hook event type this handler processes.
    fn event_type(&self) -> &'static str;

    /// Handles the hook event.
    ///
    /// # Errors
    ///
    /// Returns an error if handling fails.
    fn handle(&self, input: &str) -> Result<String>;
}

/// Parses a hook payload; blank input is treated as `{}`.
fn parse_input<T: DeserializeOwned>(event: &str, input: &str) -> Result<T> {
    let input = if input.trim().is_empty() { "{}" } else { input };
    serde_json::from_str(input)
        .map_err(|e| Error::Validation(format!("invalid {event} hook input: {e}")))
}
