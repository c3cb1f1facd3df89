//! Namespaced tool registry.
//!
//! Every tool is registered under `{provider}_{tool}`. The qualified name maps
//! back to exactly one `(provider, tool)` pair; registration never overwrites.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{RawTool, RegistryError, ToolDescriptor, ToolError};

/// Separator between provider id and tool name.
pub const SEPARATOR: &str = "_";

/// Build the qualified name of a provider's tool.
pub fn qualify(provider_id: &str, tool_name: &str) -> String {
    format!("{provider_id}{SEPARATOR}{tool_name}")
}

/// How a name that only matches by suffix is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// First suffix match in registration order wins.
    #[default]
    FirstMatch,
    /// A suffix that matches more than one tool is an error.
    Strict,
}

/// The merged catalog of all connected providers.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
    providers: Vec<String>,
    resolution: Resolution,
}

impl ToolRegistry {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            ..Self::default()
        }
    }

    /// Register a provider's tools.
    ///
    /// The batch is all-or-nothing: if any qualified name is already taken,
    /// or repeats within the batch, nothing is registered.
    pub fn register(
        &mut self,
        provider_id: &str,
        raw_tools: Vec<RawTool>,
    ) -> Result<Vec<ToolDescriptor>, RegistryError> {
        if provider_id.is_empty() {
            return Err(RegistryError::EmptyProviderId);
        }
        if self.providers.iter().any(|p| p == provider_id) {
            return Err(RegistryError::DuplicateProvider(provider_id.to_string()));
        }

        let mut batch: Vec<ToolDescriptor> = Vec::with_capacity(raw_tools.len());
        for raw in raw_tools {
            let qualified_name = qualify(provider_id, &raw.name);
            let taken = self.index.contains_key(&qualified_name)
                || batch.iter().any(|d| d.qualified_name == qualified_name);
            if taken {
                return Err(RegistryError::Duplicate {
                    qualified_name,
                    provider_id: provider_id.to_string(),
                });
            }
            batch.push(ToolDescriptor {
                qualified_name,
                provider_id: provider_id.to_string(),
                original_name: raw.name,
                description: raw.description,
                parameter_schema: raw.input_schema,
            });
        }

        for descriptor in &batch {
            debug!(tool = %descriptor.qualified_name, provider = provider_id, "registered tool");
            self.index
                .insert(descriptor.qualified_name.clone(), self.descriptors.len());
            self.descriptors.push(descriptor.clone());
        }
        self.providers.push(provider_id.to_string());

        Ok(batch)
    }

    /// Map a model-supplied tool name back to its descriptor.
    ///
    /// Exact qualified names win. Otherwise the name is treated as a suffix,
    /// since models sometimes drop the provider prefix.
    pub fn resolve(&self, called_name: &str) -> Result<&ToolDescriptor, ToolError> {
        if let Some(&idx) = self.index.get(called_name) {
            return Ok(&self.descriptors[idx]);
        }
        if called_name.is_empty() {
            return Err(ToolError::Unresolved(called_name.to_string()));
        }

        let matches: Vec<&ToolDescriptor> = self
            .descriptors
            .iter()
            .filter(|d| d.qualified_name.ends_with(called_name))
            .collect();

        match matches.as_slice() {
            [] => Err(ToolError::Unresolved(called_name.to_string())),
            [only] => Ok(*only),
            [first, ..] => {
                let candidates: Vec<String> =
                    matches.iter().map(|d| d.qualified_name.clone()).collect();
                if self.resolution == Resolution::Strict {
                    return Err(ToolError::Ambiguous {
                        name: called_name.to_string(),
                        candidates,
                    });
                }
                warn!(
                    tool = called_name,
                    chosen = %first.qualified_name,
                    ?candidates,
                    "ambiguous tool name, using first match"
                );
                Ok(*first)
            }
        }
    }

    /// All descriptors, in registration order.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Registered provider ids, in registration order.
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
