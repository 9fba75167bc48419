use chrono::{DateTime, Local, NaiveDateTime};

/// Client-side cache of the simulation the server currently holds.
///
/// Always replaced as a unit; the controller never edits single fields.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimulationSession {
    /// Identifier of the first agent (for example `blake_lively`).
    pub agent_1: String,
    /// Identifier of the second agent.
    pub agent_2: String,
    /// Scenario template identifier.
    pub scenario: String,
    pub interactions_per_scene: u32,
    /// Server timestamp as sent (ISO-8601, usually without offset).
    pub started_at: String,
}

impl SimulationSession {
    /// Parses `started_at` as RFC 3339 or as a naive local timestamp.
    pub fn started_at_local(&self) -> Option<NaiveDateTime> {
        let raw = self.started_at.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Local).naive_local());
        }
        raw.parse::<NaiveDateTime>().ok()
    }

    /// `started_at` formatted for display, or the raw value when unparseable.
    pub fn started_at_display(&self) -> String {
        match self.started_at_local() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.started_at.clone(),
        }
    }

    /// Display name of agent 1 or 2; `None` when that agent id is blank.
    pub fn agent_label(&self, slot: AgentSlot) -> Option<String> {
        let id = match slot {
            AgentSlot::First => &self.agent_1,
            AgentSlot::Second => &self.agent_2,
        };
        (!id.trim().is_empty()).then(|| title_case(id))
    }
}

/// Which of the two simulated agents an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentSlot {
    First,
    Second,
}

/// Converts an underscore-delimited identifier into Title Case
/// (`blake_lively` -> `Blake Lively`).
pub fn title_case(identifier: &str) -> String {
    identifier
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
