//! Tool catalog types.

use super::schema;
use crate::model::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool as a provider reports it, before namespacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A registered tool, addressable by its qualified name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub qualified_name: String,
    pub provider_id: String,
    pub original_name: String,
    pub description: String,
    pub parameter_schema: Value,
}

impl ToolDescriptor {
    /// The model-facing declaration, with the schema normalized.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.qualified_name.clone(),
            description: self.description.clone(),
            schema: schema::normalize(&self.parameter_schema),
        }
    }
}
