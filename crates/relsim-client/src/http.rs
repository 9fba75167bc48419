use futures::StreamExt as _;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::SimulationApi;
use crate::config::ClientConfig;
use crate::decoder::{ByteStream, EventStream, decode_event_stream};
use crate::errors::ClientError;
use crate::model::{
    AgentSummary, ApiReply, FileRequest, RunRequest, ScenarioSummary, SimulationStatus,
    StartRequest,
};

const START_PATH: &str = "/api/start_simulation";
const RUN_STREAM_PATH: &str = "/api/run_simulation_stream";
const SAVE_PATH: &str = "/api/save_simulation";
const LOAD_PATH: &str = "/api/load_simulation";
const STATUS_PATH: &str = "/api/simulation_status";
const AGENTS_PATH: &str = "/api/agents";
const SCENARIOS_PATH: &str = "/api/scenarios";

/// `SimulationApi` over HTTP with `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpSimulationApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpSimulationApi {
    /// Creates a client from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        // No client-wide timeout: it would also cap the run stream.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            // The server keeps the active simulation in a cookie session.
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("request to {path} failed: {e}")))?;
        read_json_reply(path, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.config.endpoint(path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("request to {path} failed: {e}")))?;
        read_json_reply(path, response).await
    }
}

/// The server reports application failures as JSON on 4xx/5xx, so the body
/// is parsed first and the status only matters when parsing fails.
async fn read_json_reply<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::transport(format!("reading {path} response failed: {e}")))?;
    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ClientError::Http {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(ClientError::decode(format!(
            "unexpected {path} response: {e}"
        ))),
    }
}

#[async_trait::async_trait]
impl SimulationApi for HttpSimulationApi {
    async fn start_simulation(&self, req: StartRequest) -> Result<ApiReply, ClientError> {
        self.post_json(START_PATH, &req).await
    }

    async fn run_simulation_stream(&self, req: RunRequest) -> Result<EventStream, ClientError> {
        let url = self.config.endpoint(RUN_STREAM_PATH);
        debug!(%url, mode = %req.mode, interactions = req.interactions_per_scene, "opening run stream");
        let response = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("run stream request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| ClientError::transport(format!("run stream read failed: {e}")))
        }));
        Ok(decode_event_stream(bytes_stream))
    }

    async fn save_simulation(&self, req: FileRequest) -> Result<ApiReply, ClientError> {
        self.post_json(SAVE_PATH, &req).await
    }

    async fn load_simulation(&self, req: FileRequest) -> Result<ApiReply, ClientError> {
        self.post_json(LOAD_PATH, &req).await
    }

    async fn simulation_status(&self) -> Result<SimulationStatus, ClientError> {
        self.get_json(STATUS_PATH).await
    }

    async fn agents(&self) -> Result<Vec<AgentSummary>, ClientError> {
        self.get_json(AGENTS_PATH).await
    }

    async fn scenarios(&self) -> Result<Vec<ScenarioSummary>, ClientError> {
        self.get_json(SCENARIOS_PATH).await
    }
}
