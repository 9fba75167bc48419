use std::fmt;

use crate::session::{AgentSlot, SimulationSession};
use crate::stream::StreamEvent;

const SCENE_MASTER_MARKERS: [&str; 2] = ["[Scene Master]", "[Scene Master:]"];
const SYSTEM_PHRASES: [&str; 3] = ["is appraising", "is making a choice", "Adding scene conflict"];

/// Display category of a stream event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Error,
    SceneMaster,
    Agent1,
    Agent2,
    General,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::SceneMaster => "scene-master",
            Self::Agent1 => "agent-1",
            Self::Agent2 => "agent-2",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category plus the human label shown next to the content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub label: String,
}

impl Classification {
    fn new(category: Category, label: impl Into<String>) -> Self {
        Self {
            category,
            label: label.into(),
        }
    }
}

/// First-match classification of an event against the active session.
///
/// Order: explicit error, scene master (tag or marker), agent tags, known
/// system phrases, then a generic `Output` label.
pub fn classify(event: &StreamEvent, session: Option<&SimulationSession>) -> Classification {
    if event.is_kind("error") {
        return Classification::new(Category::Error, "Error");
    }
    if event.is_kind("scene-master")
        || SCENE_MASTER_MARKERS
            .iter()
            .any(|marker| event.content.contains(marker))
    {
        return Classification::new(Category::SceneMaster, "Scene Master");
    }
    if event.is_kind("agent-1") {
        return Classification::new(
            Category::Agent1,
            agent_label(AgentSlot::First, event, session),
        );
    }
    if event.is_kind("agent-2") {
        return Classification::new(
            Category::Agent2,
            agent_label(AgentSlot::Second, event, session),
        );
    }
    if SYSTEM_PHRASES
        .iter()
        .any(|phrase| event.content.contains(phrase))
    {
        return Classification::new(Category::General, "System");
    }
    Classification::new(Category::General, "Output")
}

fn agent_label(slot: AgentSlot, event: &StreamEvent, session: Option<&SimulationSession>) -> String {
    if let Some(label) = session.and_then(|s| s.agent_label(slot)) {
        return label;
    }
    if let Some(name) = speaker_marker(&event.content) {
        return name.to_string();
    }
    match slot {
        AgentSlot::First => "Agent 1".to_string(),
        AgentSlot::Second => "Agent 2".to_string(),
    }
}

/// Returns the first non-empty `[Name]` marker in `content`.
pub fn speaker_marker(content: &str) -> Option<&str> {
    let mut rest = content;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let close = after.find(']')?;
        let name = &after[..close];
        if !name.is_empty() {
            return Some(name);
        }
        rest = &after[close + 1..];
    }
    None
}
