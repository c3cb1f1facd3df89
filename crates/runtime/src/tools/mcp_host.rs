//! MCP servers as tool providers.

use super::{RawTool, ToolError, ToolProvider};
use serde_json::{Map, Value};
use tracing::warn;

impl ToolProvider for mcp::Server {
    fn id(&self) -> &str {
        self.name()
    }

    async fn list_tools(&self) -> Result<Vec<RawTool>, ToolError> {
        Ok(self
            .tools()
            .iter()
            .map(|tool| RawTool {
                name: tool.name.clone(),
                description: tool.description.clone().unwrap_or_default(),
                input_schema: tool.input_schema.clone(),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String, ToolError> {
        mcp::Server::call_tool(self, name, Some(arguments))
            .await
            .map(|output| output.text)
            .map_err(|e| match e {
                mcp::Error::ToolCallFailed(message) => ToolError::Invocation(message),
                other => ToolError::Invocation(other.to_string()),
            })
    }

    async fn shutdown(self) {
        let name = self.name().to_string();
        if let Err(e) = mcp::Server::shutdown(self).await {
            warn!(server = %name, error = %e, "failed to shut down MCP server cleanly");
        }
    }
}
