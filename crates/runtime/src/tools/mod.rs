//! Tool providers, the namespaced registry and invocation.

pub mod errors;
mod host;
mod mcp_host;
mod provider;
pub mod registry;
mod retry;
pub mod schema;
mod types;

pub use errors::{RegistryError, ToolError};
pub use host::{InvocationSettings, ToolHost};
pub use provider::ToolProvider;
pub use registry::{Resolution, SEPARATOR, ToolRegistry, qualify};
pub use retry::RetryPolicy;
pub use types::{RawTool, ToolDescriptor};
