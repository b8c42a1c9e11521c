//! Error types for the core module.

/// Core error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No agent backend is configured.
    #[error("no agent backend configured")]
    NoBackend,

    /// The agent backend rejected or failed the run.
    #[error("agent run failed: {0}")]
    Agent(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Protocol(#[from] agent_protocol::ProtocolError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
