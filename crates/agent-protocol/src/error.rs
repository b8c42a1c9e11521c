//! Protocol error types.

/// Errors surfaced while decoding an event stream.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The underlying byte stream failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A payload could not be decoded as JSON.
    #[error("invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
