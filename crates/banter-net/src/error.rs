use thiserror::Error;

/// Errors produced by the connection layer.
#[derive(Error, Debug)]
pub enum NetError {
    /// Connecting requires a configured access token.
    #[error("No access token configured")]
    MissingCredential,

    /// The server URL could not be parsed or has an unsupported scheme.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// The WebSocket handshake was rejected or failed mid-flight.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    /// A connect attempt did not complete within the configured budget.
    #[error("Connection attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The operation requires a live connection.
    #[error("Not connected")]
    NotConnected,

    /// All consecutive connect attempts failed; automatic retries stopped.
    #[error("Gave up after {0} failed connection attempts")]
    RetriesExhausted(u32),

    /// The connection task has terminated and no longer accepts commands.
    #[error("Connection task is not running")]
    TaskGone,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetError>;
