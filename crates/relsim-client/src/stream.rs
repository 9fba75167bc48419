use std::fmt;

/// A single decoded unit from the run stream.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StreamEvent {
    /// Free-form tag (`error`, `scene-master`, `agent-1`, `agent-2`, `output`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Arbitrary text, possibly containing `[Name]` speaker markers.
    #[serde(default)]
    pub content: String,
    /// Server-side ISO-8601 timestamp when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl StreamEvent {
    /// Creates an event with the given tag and content.
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            content: content.into(),
            timestamp: None,
        }
    }

    /// Creates an untagged event.
    pub fn untagged(content: impl Into<String>) -> Self {
        Self {
            kind: None,
            content: content.into(),
            timestamp: None,
        }
    }

    /// Returns true if the event carries the given tag.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

/// Which server-side runner drives the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Run every scene back to back.
    #[default]
    Auto,
    /// Run one scene at a time.
    Scene,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Scene => "scene",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
