//! Common imports for typical client usage.
pub use crate::{
    Category, ClientConfig, ClientError, Notification, NotificationLevel, RenderedResult, RunMode,
    SessionController, SimulationRun, SimulationSession, StartRequest, StreamEvent,
};
