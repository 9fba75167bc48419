use crate::decoder::EventStream;
use crate::errors::ClientError;
use crate::model::{
    AgentSummary, ApiReply, FileRequest, RunRequest, ScenarioSummary, SimulationStatus,
    StartRequest,
};

/// Server calls used by `SessionController`.
///
/// Each method is exactly one request. `ApiReply` values are returned as
/// sent, including `success: false`; interpreting them is the controller's
/// job.
#[async_trait::async_trait]
pub trait SimulationApi: Send + Sync {
    /// `POST /api/start_simulation`.
    async fn start_simulation(&self, req: StartRequest) -> Result<ApiReply, ClientError>;

    /// `POST /api/run_simulation_stream`.
    ///
    /// Fails with a terminal error when the request fails or the status is
    /// not a success; otherwise returns the decoded body stream.
    async fn run_simulation_stream(&self, req: RunRequest) -> Result<EventStream, ClientError>;

    /// `POST /api/save_simulation`.
    async fn save_simulation(&self, req: FileRequest) -> Result<ApiReply, ClientError>;

    /// `POST /api/load_simulation`.
    async fn load_simulation(&self, req: FileRequest) -> Result<ApiReply, ClientError>;

    /// `GET /api/simulation_status`.
    async fn simulation_status(&self) -> Result<SimulationStatus, ClientError>;

    /// `GET /api/agents`.
    async fn agents(&self) -> Result<Vec<AgentSummary>, ClientError>;

    /// `GET /api/scenarios`.
    async fn scenarios(&self) -> Result<Vec<ScenarioSummary>, ClientError>;
}
