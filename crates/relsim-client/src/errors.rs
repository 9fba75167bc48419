/// Errors produced while decoding a single stream frame.
///
/// These never terminate a stream; the decoder logs and skips the frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The `data: ` payload was not a valid `StreamEvent` JSON object.
    #[error("invalid stream frame JSON: {message}")]
    InvalidJson { line: String, message: String },
}

impl FrameError {
    /// Creates an invalid-JSON frame error.
    pub fn invalid_json(line: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidJson {
            line: line.into(),
            message: message.into(),
        }
    }

    /// Returns the offending frame payload.
    pub fn line(&self) -> &str {
        match self {
            Self::InvalidJson { line, .. } => line,
        }
    }
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Input rejected before any network call was made.
    #[error("{0}")]
    Validation(String),
    /// Server answered with `success: false`.
    #[error("{message}")]
    Application { message: String },
    /// Request could not be sent or the response body could not be read.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Server answered with a non-success status and no usable reply body.
    #[error("HTTP error! status: {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body did not match the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },
    /// A run was requested while another run is still streaming.
    #[error("Simulation is already running")]
    AlreadyRunning,
}

impl ClientError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
