use serde::{Deserialize, Serialize};

use crate::error::ForgeApiError;

pub const TITLE_DEBUG: &str = "Debug";
pub const TITLE_SESSION: &str = "Session";
pub const TITLE_ERROR: &str = "Error";

/// Raw wire shape of one server-pushed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireStep {
    pub title: String,
    pub output: String,
}

/// Step event decoded at the stream boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    /// Diagnostic output, never shown in the transcript.
    Debug { output: String },
    /// Backend session token (its working-directory handle).
    Session { token: String },
    /// Terminal failure fragment for the step in progress.
    Error { output: String },
    /// Incremental output for a named step.
    Step { title: String, output: String },
}

impl StepEvent {
    pub fn step(title: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Step {
            title: title.into(),
            output: output.into(),
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self::Error {
            output: output.into(),
        }
    }

    pub fn session(token: impl Into<String>) -> Self {
        Self::Session {
            token: token.into(),
        }
    }

    /// Title as it appeared on the wire.
    pub fn title(&self) -> &str {
        match self {
            Self::Debug { .. } => TITLE_DEBUG,
            Self::Session { .. } => TITLE_SESSION,
            Self::Error { .. } => TITLE_ERROR,
            Self::Step { title, .. } => title,
        }
    }

    /// Output fragment carried by the event.
    pub fn output(&self) -> &str {
        match self {
            Self::Debug { output } | Self::Error { output } | Self::Step { output, .. } => output,
            Self::Session { token } => token,
        }
    }

    /// Control events never reach the transcript.
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Debug { .. } | Self::Session { .. })
    }
}

impl From<WireStep> for StepEvent {
    fn from(wire: WireStep) -> Self {
        let WireStep { title, output } = wire;
        match title.as_str() {
            TITLE_DEBUG => Self::Debug { output },
            TITLE_SESSION => Self::Session { token: output },
            TITLE_ERROR => Self::Error { output },
            _ => Self::Step { title, output },
        }
    }
}

impl From<StepEvent> for WireStep {
    fn from(event: StepEvent) -> Self {
        Self {
            title: event.title().to_string(),
            output: event.output().to_string(),
        }
    }
}

/// Lifecycle signal delivered by an [`crate::EventStream`] to its owner.
#[derive(Debug)]
pub enum StreamSignal {
    Event(StepEvent),
    /// A transport error occurred and a reconnect is scheduled after `delay`.
    Retrying {
        attempt: u32,
        delay: std::time::Duration,
        error: String,
    },
    /// The response body ended cleanly.
    Completed,
    /// Retries are exhausted. Delivered at most once and always last.
    Failed(ForgeApiError),
}

impl StreamSignal {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}
