//! Switchboard runtime: the multi-provider tool-dispatch loop.
//!
//! This crate connects an LLM backend to tools served by several
//! independent providers. Tool catalogs are merged into one namespaced
//! list, tool calls are routed back to the provider that owns them, and
//! results are fed to the model until it answers in text or the round
//! budget runs out.
//!
//! # Overview
//!
//! - **Session**: runs the dispatch loop for each query and keeps an
//!   optional bounded history of earlier exchanges.
//! - **Backend**: a trait abstracting model providers (Gemini, Anthropic).
//! - **ToolHost**: owns the connected tool providers and the registry of
//!   their qualified tool names.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{GeminiBackend, InvocationSettings, Session, ToolHost};
//!
//! # async fn example(config: mcp::ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let backend = GeminiBackend::builder("api-key", "gemini-2.5-flash").build();
//!
//! let mut tools = ToolHost::new(InvocationSettings::default());
//! tools.attach(mcp::Server::spawn(config).await?).await?;
//!
//! let mut session = Session::new(backend, tools).with_history(5);
//! let answer = session.process_query("play some jazz").await?;
//! println!("{answer}");
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod history;
pub mod model;
mod providers;
mod session;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

pub use history::{ConversationHistory, HistoryEntry, RESPONSE_PREVIEW_CHARS};

pub use model::{Backend, Message, ModelError, Part, Role, ToolCall, ToolChoice, ToolSpec};

pub use providers::{
    AnthropicBackend, AnthropicBackendBuilder, AnyBackend, DEFAULT_ANTHROPIC_MODEL,
    DEFAULT_GEMINI_MODEL, DEFAULT_MAX_TOKENS, GeminiBackend, GeminiBackendBuilder,
    GenerationConfig,
};

pub use session::{
    DEFAULT_MAX_ROUNDS, DispatchOutcome, DispatchSettings, INCOMPLETE_ANSWER, Session,
};

pub use tools::{
    InvocationSettings, RegistryError, Resolution, RetryPolicy, ToolDescriptor, ToolError,
    ToolHost, ToolProvider, ToolRegistry,
};
