use crate::pipeline::PipelineError;
use thiserror::Error;

/// Failure of a call or of the connection carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// The connection dropped while the call was in flight, or it is
    /// currently being re-established. Callers may retry once it is open.
    #[error("disconnected from peer")]
    Disconnected,
    /// The connection was shut down or gave up reconnecting.
    #[error("connection is closed")]
    Closed,
    #[error("{0}")]
    Remote(String),
    #[error("failed to encode message: {0}")]
    Encode(String),
    #[error("failed to decode result: {0}")]
    Decode(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("handshake timed out")]
    HandshakeTimeout,
    #[error("no free port on {host} between {min_port} and {max_port}")]
    NoFreePort {
        host: String,
        min_port: u16,
        max_port: u16,
    },
    #[error("unknown client {0}")]
    UnknownClient(u64),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl SocketError {
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        SocketError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SocketError {
    fn from(err: serde_json::Error) -> Self {
        SocketError::Encode(err.to_string())
    }
}
