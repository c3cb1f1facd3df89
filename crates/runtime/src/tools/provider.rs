//! Tool provider trait.

use super::{RawTool, ToolError};
use serde_json::{Map, Value};
use std::future::Future;

/// A connected source of tools, one per domain (calendar, media, shell...).
///
/// This is the boundary between the dispatch loop and side effects.
pub trait ToolProvider: Send + Sync {
    /// Identifier used as the namespace prefix for this provider's tools.
    fn id(&self) -> &str;

    /// The provider's tool catalog.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<RawTool>, ToolError>> + Send;

    /// Invoke a tool by its provider-local name.
    fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = Result<String, ToolError>> + Send;

    /// Release the provider. Called once, at session end.
    fn shutdown(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}
