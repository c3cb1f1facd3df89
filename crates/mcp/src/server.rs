//! MCP server management (spawn, handshake, tool calls, teardown).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParams;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{ToolInfo, ToolOutput};

/// Default timeout for the handshake and tool listing.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum text returned from a single tool call (1MB).
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Configuration for an MCP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Working directory of the server process.
    pub working_dir: Option<PathBuf>,
}

/// Handle to a running, initialized MCP server.
///
/// Dropping the handle cancels the session and kills the child process.
pub struct Server {
    config: ServerConfig,
    service: RunningService<RoleClient, ()>,
    tools: Vec<ToolInfo>,
}

impl Server {
    /// Spawn a server process, run the initialize handshake and fetch its tools.
    pub async fn spawn(config: ServerConfig) -> Result<Self> {
        Self::spawn_with_timeout(config, DEFAULT_TIMEOUT).await
    }

    /// Like [`Server::spawn`], with an explicit handshake timeout.
    pub async fn spawn_with_timeout(config: ServerConfig, limit: Duration) -> Result<Self> {
        let args = config.args.clone();
        let env = config.env.clone();
        let working_dir = config.working_dir.clone();

        let transport = TokioChildProcess::new(Command::new(&config.command).configure(
            move |cmd| {
                cmd.args(&args).envs(&env);
                if let Some(dir) = &working_dir {
                    cmd.current_dir(dir);
                }
            },
        ))?;

        let service = timeout(limit, ().serve(transport))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::Handshake(e.to_string()))?;

        info!(server = %config.name, command = %config.command, "MCP server initialized");

        let mut server = Self {
            config,
            service,
            tools: Vec::new(),
        };
        server.refresh_tools(limit).await?;
        Ok(server)
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Re-fetch the tool list from the server.
    pub async fn refresh_tools(&mut self, limit: Duration) -> Result<()> {
        let tools = timeout(limit, self.service.list_all_tools())
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::Service(e.to_string()))?;

        self.tools = tools
            .iter()
            .map(ToolInfo::from_model)
            .collect::<Result<Vec<_>>>()?;

        debug!(server = %self.config.name, count = self.tools.len(), "listed tools");
        Ok(())
    }

    /// Tools reported by the server at the last refresh.
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    /// Call a tool by its server-local name.
    ///
    /// A result flagged `isError` by the server is returned as
    /// [`Error::ToolCallFailed`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<ToolOutput> {
        let params = CallToolRequestParams {
            name: name.to_string().into(),
            arguments,
            meta: None,
            task: None,
        };

        let result = self
            .service
            .call_tool(params)
            .await
            .map_err(|e| Error::Service(e.to_string()))?;

        let output = ToolOutput::from_model(&result)?;

        if output.is_error {
            return Err(Error::ToolCallFailed(output.text));
        }

        if output.text.len() > MAX_OUTPUT_SIZE {
            return Err(Error::OutputTooLarge {
                size: output.text.len(),
                max: MAX_OUTPUT_SIZE,
            });
        }

        Ok(output)
    }

    /// Cancel the session and terminate the server process.
    pub async fn shutdown(self) -> Result<()> {
        let name = self.config.name;
        self.service
            .cancel()
            .await
            .map_err(|e| Error::Service(e.to_string()))?;
        debug!(server = %name, "MCP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("tools", &self.tools.len())
            .finish()
    }
}
