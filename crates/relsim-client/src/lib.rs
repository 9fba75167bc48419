//! Client for the relationship-simulation dashboard server.
//!
//! The server owns the simulation; this crate drives it over HTTP, decodes the
//! streamed run output into `StreamEvent`s and turns them into labelled,
//! terminal-safe results.
//!
//! # Usage
//!
//! ```no_run
//! use relsim_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let controller = SessionController::http(ClientConfig::from_env()?)?;
//!
//! controller
//!     .start(StartRequest::new("jane_doe", "bob_smith", "first_date", 5))
//!     .await?;
//!
//! let mut run = controller.run(RunMode::Auto).await?;
//! while let Some(result) = run.next_result().await {
//!     println!("{}", result?);
//! }
//! # Ok(())
//! # }
//! ```

/// Server calls behind a trait so the controller can be tested without HTTP.
pub mod api;
/// Display classification of stream events.
pub mod classify;
/// HTTP client configuration.
pub mod config;
/// Session controller and live run handle.
pub mod controller;
/// Incremental `data: <json>` frame decoder.
pub mod decoder;
/// Public error types.
pub mod errors;
/// `reqwest` implementation of `SimulationApi`.
pub mod http;
/// JSON request and reply bodies.
pub mod model;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Pure formatting of results, sessions and notifications.
pub mod render;
/// Cached simulation session.
pub mod session;
/// Stream event and run mode types.
pub mod stream;

pub use api::SimulationApi;
pub use classify::{Category, Classification, classify};
pub use config::ClientConfig;
pub use controller::{RunSummary, SessionController, SimulationRun};
pub use decoder::{EventStream, StreamDecoder, decode_event_stream};
pub use errors::{ClientError, FrameError};
pub use http::HttpSimulationApi;
pub use model::{
    AgentSummary, ApiReply, ScenarioSummary, SimulationStatus, StartRequest,
};
pub use render::{Notification, NotificationLevel, RenderedResult};
pub use session::SimulationSession;
pub use stream::{RunMode, StreamEvent};
