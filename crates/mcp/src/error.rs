//! MCP error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn server: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("initialize handshake failed: {0}")]
    Handshake(String),

    #[error("timeout waiting for response")]
    Timeout,

    #[error("service error: {0}")]
    Service(String),

    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("output too large: {size} bytes (max {max})")]
    OutputTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
