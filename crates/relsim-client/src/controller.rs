use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt as _;
use tracing::{debug, info, warn};

use crate::api::SimulationApi;
use crate::config::ClientConfig;
use crate::decoder::EventStream;
use crate::errors::ClientError;
use crate::http::HttpSimulationApi;
use crate::model::{
    AgentSummary, ApiReply, DEFAULT_INTERACTIONS_PER_SCENE, FileRequest, RunRequest,
    ScenarioSummary, SimulationStatus, StartRequest,
};
use crate::render::{RenderedResult, render};
use crate::session::SimulationSession;
use crate::stream::RunMode;

const INTERACTIONS_TOO_LOW: &str = "Interactions per scene must be at least 1";

#[derive(Default)]
struct ControllerState {
    session: Option<SimulationSession>,
    results: Vec<RenderedResult>,
}

/// Owns the active session, the rendered results and the running flag.
///
/// All methods take `&self`; the state lock is never held across an
/// `.await`, and the running flag is claimed with a single
/// compare-and-exchange so concurrent `run` calls cannot both win.
pub struct SessionController {
    api: Arc<dyn SimulationApi>,
    state: Mutex<ControllerState>,
    running: AtomicBool,
}

impl SessionController {
    pub fn new(api: Arc<dyn SimulationApi>) -> Self {
        Self {
            api,
            state: Mutex::new(ControllerState::default()),
            running: AtomicBool::new(false),
        }
    }

    /// Controller backed by `HttpSimulationApi`.
    pub fn http(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(Arc::new(HttpSimulationApi::new(config)?)))
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_session(&self, session: SimulationSession) {
        info!(
            agent_1 = %session.agent_1,
            agent_2 = %session.agent_2,
            scenario = %session.scenario,
            "active simulation updated"
        );
        self.state().session = Some(session);
    }

    /// Snapshot of the active session.
    pub fn session(&self) -> Option<SimulationSession> {
        self.state().session.clone()
    }

    /// Snapshot of the rendered results, oldest first.
    pub fn results(&self) -> Vec<RenderedResult> {
        self.state().results.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts a new simulation and caches the returned session.
    pub async fn start(&self, req: StartRequest) -> Result<SimulationSession, ClientError> {
        validate_start(&req)?;
        let reply = self.api.start_simulation(req).await?;
        let reply = require_success(reply, "Failed to start simulation")?;
        let session = reply.simulation_info.ok_or_else(|| {
            ClientError::decode("start reply is missing simulation_info")
        })?;
        self.replace_session(session.clone());
        Ok(session)
    }

    /// Opens the run stream with the cached session's interactions per scene.
    pub async fn run(&self, mode: RunMode) -> Result<SimulationRun<'_>, ClientError> {
        self.run_with_interactions(mode, None).await
    }

    /// Opens the run stream.
    ///
    /// `interactions` overrides the cached session's value; with neither,
    /// `DEFAULT_INTERACTIONS_PER_SCENE` is sent. Rejected with
    /// `AlreadyRunning` while another `SimulationRun` is alive. Previous
    /// results are cleared once the run is claimed.
    pub async fn run_with_interactions(
        &self,
        mode: RunMode,
        interactions: Option<u32>,
    ) -> Result<SimulationRun<'_>, ClientError> {
        if interactions == Some(0) {
            return Err(ClientError::validation(INTERACTIONS_TOO_LOW));
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(%mode, "run rejected: simulation is already running");
            return Err(ClientError::AlreadyRunning);
        }
        let guard = RunGuard(&self.running);

        let interactions_per_scene = {
            let mut state = self.state();
            state.results.clear();
            interactions
                .or_else(|| state.session.as_ref().map(|s| s.interactions_per_scene))
                .unwrap_or(DEFAULT_INTERACTIONS_PER_SCENE)
        };
        let run_id = uuid::Uuid::new_v4();
        debug!(%run_id, %mode, interactions_per_scene, "starting simulation run");
        let stream = self
            .api
            .run_simulation_stream(RunRequest {
                mode,
                interactions_per_scene,
            })
            .await?;

        Ok(SimulationRun {
            controller: self,
            run_id,
            stream,
            received: 0,
            done: false,
            _guard: guard,
        })
    }

    /// Saves the server-side simulation under `filename`.
    pub async fn save(&self, filename: &str) -> Result<String, ClientError> {
        let filename = validate_filename(filename)?;
        let reply = self.api.save_simulation(FileRequest { filename }).await?;
        let reply = require_success(reply, "Failed to save simulation")?;
        Ok(reply
            .message
            .unwrap_or_else(|| "Simulation saved successfully".to_string()))
    }

    /// Loads a saved simulation; the cached session is replaced when the
    /// server returns one.
    pub async fn load(&self, filename: &str) -> Result<Option<SimulationSession>, ClientError> {
        let filename = validate_filename(filename)?;
        let reply = self.api.load_simulation(FileRequest { filename }).await?;
        let reply = require_success(reply, "Failed to load simulation")?;
        if let Some(session) = reply.simulation_info.clone() {
            self.replace_session(session);
        }
        Ok(reply.simulation_info)
    }

    /// Asks the server whether it holds a simulation and caches it if so.
    pub async fn refresh_status(&self) -> Result<SimulationStatus, ClientError> {
        let status = self.api.simulation_status().await?;
        if status.has_simulation
            && let Some(session) = status.simulation_info.clone()
        {
            self.replace_session(session);
        }
        Ok(status)
    }

    pub async fn agents(&self) -> Result<Vec<AgentSummary>, ClientError> {
        self.api.agents().await
    }

    pub async fn scenarios(&self) -> Result<Vec<ScenarioSummary>, ClientError> {
        self.api.scenarios().await
    }

    /// Drops the active session and all results. No network call.
    pub fn reset(&self) {
        let mut state = self.state();
        state.session = None;
        state.results.clear();
        info!("simulation reset");
    }

    /// Drops all rendered results. No network call.
    pub fn clear_results(&self) {
        self.state().results.clear();
    }

    fn record(&self, event: &crate::stream::StreamEvent) -> RenderedResult {
        let mut state = self.state();
        let result = render(event, state.session.as_ref());
        state.results.push(result.clone());
        result
    }
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Counters reported when a run completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: uuid::Uuid,
    pub results: usize,
}

/// A live run. The controller stays in the running state until this handle
/// is finished or dropped.
pub struct SimulationRun<'a> {
    controller: &'a SessionController,
    run_id: uuid::Uuid,
    stream: EventStream,
    received: usize,
    done: bool,
    _guard: RunGuard<'a>,
}

impl SimulationRun<'_> {
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Waits for the next event, renders it and records it in the
    /// controller's results.
    ///
    /// Returns `None` at end of stream. A transport error is returned once
    /// and ends the run.
    pub async fn next_result(&mut self) -> Option<Result<RenderedResult, ClientError>> {
        if self.done {
            return None;
        }
        match self.stream.next().await {
            Some(Ok(event)) => {
                self.received += 1;
                Some(Ok(self.controller.record(&event)))
            }
            Some(Err(err)) => {
                warn!(run_id = %self.run_id, error = %err, "simulation run failed");
                self.done = true;
                Some(Err(err))
            }
            None => {
                debug!(run_id = %self.run_id, results = self.received, "simulation run finished");
                self.done = true;
                None
            }
        }
    }

    /// Drains the remaining events and reports the outcome.
    pub async fn finish(mut self) -> Result<RunSummary, ClientError> {
        while let Some(next) = self.next_result().await {
            next?;
        }
        Ok(RunSummary {
            run_id: self.run_id,
            results: self.received,
        })
    }
}

fn validate_start(req: &StartRequest) -> Result<(), ClientError> {
    if req.agent_1.trim().is_empty()
        || req.agent_2.trim().is_empty()
        || req.scenario.trim().is_empty()
    {
        return Err(ClientError::validation(
            "Please select both agents and a scenario",
        ));
    }
    if req.agent_1 == req.agent_2 {
        return Err(ClientError::validation("Please select different agents"));
    }
    if req.interactions_per_scene == 0 {
        return Err(ClientError::validation(INTERACTIONS_TOO_LOW));
    }
    Ok(())
}

fn validate_filename(filename: &str) -> Result<String, ClientError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation("Please enter a filename"));
    }
    Ok(trimmed.to_string())
}

fn require_success(reply: ApiReply, fallback: &str) -> Result<ApiReply, ClientError> {
    if reply.success {
        return Ok(reply);
    }
    let message = reply
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Err(ClientError::application(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::decoder::{ByteStream, decode_event_stream};
    use futures::stream;
    use std::sync::atomic::AtomicUsize;

    struct FakeApi {
        start_reply: Mutex<Option<Result<ApiReply, ClientError>>>,
        file_reply: Mutex<Option<Result<ApiReply, ClientError>>>,
        status: Mutex<SimulationStatus>,
        body: Vec<Result<Vec<u8>, ClientError>>,
        run_calls: AtomicUsize,
        start_calls: AtomicUsize,
        last_run: Mutex<Option<RunRequest>>,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                start_reply: Mutex::new(None),
                file_reply: Mutex::new(None),
                status: Mutex::new(SimulationStatus::default()),
                body: Vec::new(),
                run_calls: AtomicUsize::new(0),
                start_calls: AtomicUsize::new(0),
                last_run: Mutex::new(None),
            }
        }

        fn with_body(mut self, chunks: &[&str]) -> Self {
            self.body = chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
            self
        }

        fn with_start(self, reply: Result<ApiReply, ClientError>) -> Self {
            *self.start_reply.lock().expect("lock") = Some(reply);
            self
        }

        fn with_file_reply(self, reply: Result<ApiReply, ClientError>) -> Self {
            *self.file_reply.lock().expect("lock") = Some(reply);
            self
        }
    }

    #[async_trait::async_trait]
    impl SimulationApi for FakeApi {
        async fn start_simulation(&self, _req: StartRequest) -> Result<ApiReply, ClientError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            self.start_reply
                .lock()
                .expect("lock")
                .clone()
                .unwrap_or_else(|| Ok(ApiReply::default()))
        }

        async fn run_simulation_stream(
            &self,
            req: RunRequest,
        ) -> Result<EventStream, ClientError> {
            self.run_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_run.lock().expect("lock") = Some(req);
            let chunks: Vec<Result<bytes::Bytes, ClientError>> = self
                .body
                .iter()
                .cloned()
                .map(|c| c.map(bytes::Bytes::from))
                .collect();
            let bytes: ByteStream = Box::pin(stream::iter(chunks));
            Ok(decode_event_stream(bytes))
        }

        async fn save_simulation(&self, _req: FileRequest) -> Result<ApiReply, ClientError> {
            self.file_reply
                .lock()
                .expect("lock")
                .clone()
                .unwrap_or_else(|| Ok(ApiReply::default()))
        }

        async fn load_simulation(&self, _req: FileRequest) -> Result<ApiReply, ClientError> {
            self.file_reply
                .lock()
                .expect("lock")
                .clone()
                .unwrap_or_else(|| Ok(ApiReply::default()))
        }

        async fn simulation_status(&self) -> Result<SimulationStatus, ClientError> {
            Ok(self.status.lock().expect("lock").clone())
        }

        async fn agents(&self) -> Result<Vec<AgentSummary>, ClientError> {
            Ok(vec![AgentSummary {
                id: "jane_doe".into(),
                name: "Jane Doe".into(),
            }])
        }

        async fn scenarios(&self) -> Result<Vec<ScenarioSummary>, ClientError> {
            Ok(Vec::new())
        }
    }

    fn session() -> SimulationSession {
        SimulationSession {
            agent_1: "jane_doe".into(),
            agent_2: "bob_smith".into(),
            scenario: "cafe".into(),
            interactions_per_scene: 3,
            started_at: "2025-01-01T00:00:00".into(),
        }
    }

    fn ok_reply(info: Option<SimulationSession>) -> ApiReply {
        ApiReply {
            success: true,
            message: Some("ok".into()),
            simulation_info: info,
        }
    }

    fn failed_reply(message: &str) -> ApiReply {
        ApiReply {
            success: false,
            message: Some(message.into()),
            simulation_info: None,
        }
    }

    const FRAMES: [&str; 3] = [
        "data: {\"type\":\"scene-master\",\"content\":\"Scene 1\"}\n\ndata: {\"type\":\"agent-1\",\"con",
        "tent\":\"[Jane] hello\"}\n\ndata: {broken}\n\n",
        "data: {\"content\":\"Bob is appraising the room\"}\n\n",
    ];

    #[tokio::test]
    async fn start_validates_before_any_network_call() {
        let api = Arc::new(FakeApi::new());
        let controller = SessionController::new(api.clone());

        let err = controller
            .start(StartRequest::new("", "bob", "cafe", 5))
            .await
            .expect_err("missing agent");
        assert_eq!(
            err,
            ClientError::Validation("Please select both agents and a scenario".into())
        );
        let err = controller
            .start(StartRequest::new("bob", "bob", "cafe", 5))
            .await
            .expect_err("duplicate agent");
        assert_eq!(err, ClientError::Validation("Please select different agents".into()));
        assert!(
            controller
                .start(StartRequest::new("a", "b", "cafe", 0))
                .await
                .is_err()
        );
        assert_eq!(api.start_calls.load(Ordering::SeqCst), 0);
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn start_success_replaces_session_and_failure_leaves_it() {
        let api = Arc::new(FakeApi::new().with_start(Ok(ok_reply(Some(session())))));
        let controller = SessionController::new(api.clone());
        let started = controller
            .start(StartRequest::new("jane_doe", "bob_smith", "cafe", 3))
            .await
            .expect("start");
        assert_eq!(started, session());
        assert_eq!(controller.session(), Some(session()));

        *api.start_reply.lock().expect("lock") =
            Some(Ok(failed_reply("Error starting simulation: boom")));
        let err = controller
            .start(StartRequest::new("x", "y", "z", 2))
            .await
            .expect_err("application failure");
        assert_eq!(
            err,
            ClientError::Application {
                message: "Error starting simulation: boom".into()
            }
        );
        assert_eq!(controller.session(), Some(session()));
    }

    #[tokio::test]
    async fn run_renders_and_records_results_with_session_labels() {
        let api = Arc::new(FakeApi::new().with_body(&FRAMES));
        let controller = SessionController::new(api.clone());
        *api.status.lock().expect("lock") = SimulationStatus {
            has_simulation: true,
            is_running: false,
            simulation_info: Some(session()),
        };
        controller.refresh_status().await.expect("status");

        let run = controller.run(RunMode::Scene).await.expect("run");
        assert!(controller.is_running());
        let summary = run.finish().await.expect("finish");
        assert_eq!(summary.results, 3);
        assert!(!controller.is_running());

        let results = controller.results();
        let labels: Vec<_> = results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Scene Master", "Jane Doe", "System"]);
        assert_eq!(results[1].category, Category::Agent1);
        assert_eq!(
            api.last_run.lock().expect("lock").clone(),
            Some(RunRequest {
                mode: RunMode::Scene,
                interactions_per_scene: 3
            })
        );
    }

    #[tokio::test]
    async fn explicit_interactions_override_session_and_default() {
        let api = Arc::new(FakeApi::new().with_body(&FRAMES));
        let controller = SessionController::new(api.clone());
        let last_interactions = || {
            api.last_run
                .lock()
                .expect("lock")
                .as_ref()
                .map(|r| r.interactions_per_scene)
        };

        // No cached session: a fresh process running with an explicit count.
        let run = controller
            .run_with_interactions(RunMode::Auto, Some(8))
            .await
            .expect("run");
        run.finish().await.expect("finish");
        assert_eq!(last_interactions(), Some(8));

        controller.run(RunMode::Auto).await.expect("run").finish().await.expect("finish");
        assert_eq!(last_interactions(), Some(DEFAULT_INTERACTIONS_PER_SCENE));

        *api.status.lock().expect("lock") = SimulationStatus {
            has_simulation: true,
            is_running: false,
            simulation_info: Some(session()),
        };
        controller.refresh_status().await.expect("status");
        controller
            .run_with_interactions(RunMode::Scene, Some(2))
            .await
            .expect("run")
            .finish()
            .await
            .expect("finish");
        assert_eq!(last_interactions(), Some(2));
        controller
            .run_with_interactions(RunMode::Scene, None)
            .await
            .expect("run")
            .finish()
            .await
            .expect("finish");
        assert_eq!(last_interactions(), Some(3));
    }

    #[tokio::test]
    async fn zero_interactions_is_rejected_without_claiming_the_run() {
        let api = Arc::new(FakeApi::new().with_body(&FRAMES));
        let controller = SessionController::new(api.clone());
        let err = controller
            .run_with_interactions(RunMode::Auto, Some(0))
            .await
            .err()
            .expect("validation error");
        assert_eq!(err.to_string(), "Interactions per scene must be at least 1");
        assert!(!controller.is_running());
        assert_eq!(api.run_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_run_is_rejected_and_first_is_unaffected() {
        let api = Arc::new(FakeApi::new().with_body(&FRAMES));
        let controller = SessionController::new(api.clone());

        let mut first = controller.run(RunMode::Auto).await.expect("first run");
        let first_result = first.next_result().await.expect("event").expect("ok");
        assert_eq!(first_result.label, "Scene Master");

        let second = controller.run(RunMode::Scene).await;
        assert!(matches!(second, Err(ClientError::AlreadyRunning)));
        assert_eq!(api.run_calls.load(Ordering::SeqCst), 1);

        let mut rest = Vec::new();
        while let Some(next) = first.next_result().await {
            rest.push(next.expect("ok").label);
        }
        assert_eq!(rest, vec!["Jane".to_string(), "System".to_string()]);
        assert_eq!(controller.results().len(), 3);
        drop(first);

        assert!(controller.run(RunMode::Auto).await.is_ok());
        assert_eq!(api.run_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transport_error_ends_run_and_releases_flag() {
        let mut api = FakeApi::new();
        api.body = vec![
            Ok(b"data: {\"content\":\"one\"}\n".to_vec()),
            Err(ClientError::transport("connection reset")),
        ];
        let controller = SessionController::new(Arc::new(api));
        let run = controller.run(RunMode::Auto).await.expect("run");
        let err = run.finish().await.expect_err("transport failure");
        assert!(matches!(err, ClientError::Transport { .. }));
        assert!(!controller.is_running());
        assert_eq!(controller.results().len(), 1);
    }

    #[tokio::test]
    async fn new_run_clears_previous_results() {
        let controller = SessionController::new(Arc::new(FakeApi::new().with_body(&FRAMES)));
        controller
            .run(RunMode::Auto)
            .await
            .expect("run")
            .finish()
            .await
            .expect("finish");
        let run = controller.run(RunMode::Auto).await.expect("run");
        assert!(controller.results().is_empty());
        run.finish().await.expect("finish");
        assert_eq!(controller.results().len(), 3);
    }

    #[tokio::test]
    async fn reset_clears_session_and_results_unconditionally() {
        let api = Arc::new(FakeApi::new().with_body(&FRAMES));
        let controller = SessionController::new(api.clone());
        *api.status.lock().expect("lock") = SimulationStatus {
            has_simulation: true,
            is_running: false,
            simulation_info: Some(session()),
        };
        controller.refresh_status().await.expect("status");
        controller
            .run(RunMode::Auto)
            .await
            .expect("run")
            .finish()
            .await
            .expect("finish");
        assert!(!controller.results().is_empty());

        controller.reset();
        assert!(controller.session().is_none());
        assert!(controller.results().is_empty());
        controller.reset();
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn save_and_load_follow_error_taxonomy() {
        let api = Arc::new(
            FakeApi::new().with_file_reply(Ok(failed_reply("No simulation to save"))),
        );
        let controller = SessionController::new(api.clone());
        assert_eq!(
            controller.save("   ").await,
            Err(ClientError::Validation("Please enter a filename".into()))
        );
        assert_eq!(
            controller.save("run1").await,
            Err(ClientError::Application {
                message: "No simulation to save".into()
            })
        );

        *api.file_reply.lock().expect("lock") = Some(Ok(ok_reply(Some(session()))));
        let loaded = controller.load("run1.json").await.expect("load");
        assert_eq!(loaded, Some(session()));
        assert_eq!(controller.session(), Some(session()));

        *api.file_reply.lock().expect("lock") =
            Some(Err(ClientError::transport("connection refused")));
        assert!(matches!(
            controller.load("run1.json").await,
            Err(ClientError::Transport { .. })
        ));
        assert_eq!(controller.session(), Some(session()));
    }

    #[tokio::test]
    async fn status_without_simulation_keeps_cache_empty() {
        let controller = SessionController::new(Arc::new(FakeApi::new()));
        let status = controller.refresh_status().await.expect("status");
        assert!(!status.has_simulation);
        assert!(controller.session().is_none());
        assert_eq!(controller.agents().await.expect("agents").len(), 1);
    }

    #[tokio::test]
    async fn clear_results_keeps_session() {
        let api = Arc::new(FakeApi::new().with_body(&FRAMES));
        let controller = SessionController::new(api.clone());
        *api.status.lock().expect("lock") = SimulationStatus {
            has_simulation: true,
            is_running: false,
            simulation_info: Some(session()),
        };
        controller.refresh_status().await.expect("status");
        controller
            .run(RunMode::Auto)
            .await
            .expect("run")
            .finish()
            .await
            .expect("finish");
        controller.clear_results();
        assert!(controller.results().is_empty());
        assert_eq!(controller.session(), Some(session()));
    }
}
