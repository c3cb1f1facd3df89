use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while resolving or executing a tool call.
///
/// All of these are recoverable: the dispatch loop hands them back to the
/// model as an `{error: ...}` tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unresolved(String),
    #[error("ambiguous tool name '{name}', matches {candidates:?}")]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    Invocation(String),
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl ToolError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Invocation(_) | Self::Timeout(_))
    }
}

/// Errors raised while building the tool catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool '{qualified_name}' from provider '{provider_id}' collides with an existing tool")]
    Duplicate {
        qualified_name: String,
        provider_id: String,
    },
    #[error("provider '{0}' is already registered")]
    DuplicateProvider(String),
    #[error("provider id must not be empty")]
    EmptyProviderId,
}
