use thiserror::Error;

/// Errors from a model backend call.
///
/// All of them end the current query; the REPL reports them and moves on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The request never got an HTTP response.
    #[error("network: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("provider api ({status}): {body}")]
    Api { status: u16, body: String },

    /// The backend refused to answer the prompt.
    #[error("prompt blocked: {0}")]
    Blocked(String),

    /// The response body could not be understood.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
