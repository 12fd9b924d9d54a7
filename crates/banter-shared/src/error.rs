use thiserror::Error;

/// Errors produced while encoding or decoding wire events.
#[derive(Error, Debug)]
pub enum WireError {
    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
