//! Plain views of the MCP payloads the client cares about.
//!
//! rmcp's model types are converted through their JSON form so the rest of
//! the workspace never depends on rmcp directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Tool definition returned by tools/list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object" })
}

impl ToolInfo {
    /// Convert any serializable MCP tool definition.
    pub fn from_model(tool: &impl Serialize) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::to_value(tool)?)?)
    }
}

/// Flattened result of tools/call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text blocks joined by newlines, or the raw content JSON when the
    /// server returned no text.
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    /// Build from the JSON form of a `CallToolResult`.
    pub fn from_value(value: &Value) -> Self {
        let is_error = value
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let content = value.get("content").and_then(Value::as_array);
        let texts: Vec<&str> = content
            .into_iter()
            .flatten()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();

        let text = if !texts.is_empty() {
            texts.join("\n")
        } else if let Some(structured) = value.get("structuredContent") {
            structured.to_string()
        } else {
            content.map(|c| Value::Array(c.clone()).to_string()).unwrap_or_default()
        };

        Self { text, is_error }
    }

    /// Convert any serializable MCP call result.
    pub fn from_model(result: &impl Serialize) -> Result<Self> {
        Ok(Self::from_value(&serde_json::to_value(result)?))
    }
}
