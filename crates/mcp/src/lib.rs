//! MCP (Model Context Protocol) client library.
//!
//! One [`Server`] is one live connection to a tool server running as a child
//! process over stdio. Spawning performs the initialize handshake and
//! snapshots the server's tool list.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Server, ServerConfig};
//! use std::collections::HashMap;
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig {
//!     name: "media".to_string(),
//!     command: "python3".to_string(),
//!     args: vec!["server/spotify-server.py".to_string()],
//!     env: HashMap::new(),
//!     working_dir: None,
//! };
//!
//! let server = Server::spawn(config).await?;
//! for tool in server.tools() {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let output = server.call_tool("play", None).await?;
//! println!("{}", output.text);
//!
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use protocol::{ToolInfo, ToolOutput};
pub use server::{DEFAULT_TIMEOUT, MAX_OUTPUT_SIZE, Server, ServerConfig};
