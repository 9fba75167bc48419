//! Side-effect free formatting of events, sessions and notifications.
use std::fmt;

use crate::classify::{Category, classify};
use crate::errors::ClientError;
use crate::session::SimulationSession;
use crate::stream::StreamEvent;

/// One formatted entry of the results view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedResult {
    pub category: Category,
    pub label: String,
    /// Event content with control characters removed.
    pub text: String,
}

impl fmt::Display for RenderedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.label, self.text)
    }
}

/// Classifies and sanitizes an event for display.
pub fn render(event: &StreamEvent, session: Option<&SimulationSession>) -> RenderedResult {
    let classification = classify(event, session);
    RenderedResult {
        category: classification.category,
        label: classification.label,
        text: safe_text(&event.content),
    }
}

/// Drops control characters (ANSI escapes included) except newline and tab.
pub fn safe_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Rows of the "Current Simulation" panel.
pub fn describe_session(session: &SimulationSession) -> Vec<(&'static str, String)> {
    vec![
        ("Agent 1", safe_text(&session.agent_1)),
        ("Agent 2", safe_text(&session.agent_2)),
        ("Scenario", safe_text(&session.scenario)),
        (
            "Interactions per Scene",
            session.interactions_per_scene.to_string(),
        ),
        ("Started", safe_text(&session.started_at_display())),
    ]
}

/// Severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Warning,
}

impl NotificationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Transient user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    /// Error notification for a failed operation, prefixed with `context`
    /// for transport-level failures (`Error starting simulation: ...`).
    pub fn failure(context: &str, err: &ClientError) -> Self {
        match err {
            ClientError::AlreadyRunning => Self::from(err),
            ClientError::Validation(_) | ClientError::Application { .. } => {
                Self::new(NotificationLevel::Error, err.to_string())
            }
            _ => Self::new(NotificationLevel::Error, format!("{context}: {err}")),
        }
    }
}

impl From<&ClientError> for Notification {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::AlreadyRunning => Self::new(NotificationLevel::Warning, err.to_string()),
            _ => Self::new(NotificationLevel::Error, err.to_string()),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}
