//! Request and reply bodies of the simulation server's JSON API.
use serde::{Deserialize, Deserializer, Serialize};

use crate::session::SimulationSession;
use crate::stream::RunMode;

/// Default interactions per scene when no session is cached.
pub const DEFAULT_INTERACTIONS_PER_SCENE: u32 = 5;

/// Body of `POST /api/start_simulation`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub agent_1: String,
    pub agent_2: String,
    pub scenario: String,
    pub interactions_per_scene: u32,
}

impl StartRequest {
    pub fn new(
        agent_1: impl Into<String>,
        agent_2: impl Into<String>,
        scenario: impl Into<String>,
        interactions_per_scene: u32,
    ) -> Self {
        Self {
            agent_1: agent_1.into(),
            agent_2: agent_2.into(),
            scenario: scenario.into(),
            interactions_per_scene,
        }
    }
}

/// Body of `POST /api/run_simulation_stream`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub mode: RunMode,
    pub interactions_per_scene: u32,
}

/// Body of the save and load calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRequest {
    pub filename: String,
}

/// Common reply of start/save/load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub simulation_info: Option<SimulationSession>,
}

/// Reply of `GET /api/simulation_status`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStatus {
    pub has_simulation: bool,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub simulation_info: Option<SimulationSession>,
}

/// Entry of `GET /api/agents`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
}

/// Entry of `GET /api/scenarios`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub id: String,
    pub name: String,
}

// The server sends `{}` (or null) when it holds no session info.
fn empty_object_as_none<'de, D>(deserializer: D) -> Result<Option<SimulationSession>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
