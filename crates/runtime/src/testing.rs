//! In-memory doubles for the provider and backend traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::model::{
    Backend, FinishReason, Message, ModelError, ModelRequest, ModelResponse, Part, ToolCall,
    ToolChoice, Usage,
};
use crate::tools::{RawTool, ToolError, ToolProvider};

struct FakeTool {
    raw: RawTool,
    reply: Result<String, ToolError>,
}

/// A provider whose tools answer with canned replies.
pub struct FakeProvider {
    id: String,
    tools: Vec<FakeTool>,
    listing_error: Option<String>,
    failures_left: AtomicU32,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, Value)>>,
    released: Arc<AtomicBool>,
}

impl FakeProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tools: Vec::new(),
            listing_error: None,
            failures_left: AtomicU32::new(0),
            delay: None,
            calls: Mutex::new(Vec::new()),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tool(self, name: &str, reply: &str) -> Self {
        self.tool_with_schema(name, json!({"type": "object"}), reply)
    }

    pub fn tool_with_schema(mut self, name: &str, schema: Value, reply: &str) -> Self {
        self.tools.push(FakeTool {
            raw: RawTool {
                name: name.to_string(),
                description: format!("{name} tool"),
                input_schema: schema,
            },
            reply: Ok(reply.to_string()),
        });
        self
    }

    pub fn failing_tool(mut self, name: &str, message: &str) -> Self {
        self.tools.push(FakeTool {
            raw: RawTool {
                name: name.to_string(),
                description: String::new(),
                input_schema: json!({"type": "object"}),
            },
            reply: Err(ToolError::Invocation(message.to_string())),
        });
        self
    }

    pub fn failing_listing(mut self, message: &str) -> Self {
        self.listing_error = Some(message.to_string());
        self
    }

    /// Fail the first `n` calls with a transient error.
    pub fn fail_first(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls received so far, as `(original name, arguments)`.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl ToolProvider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_tools(&self) -> Result<Vec<RawTool>, ToolError> {
        if let Some(message) = &self.listing_error {
            return Err(ToolError::Invocation(message.clone()));
        }
        Ok(self.tools.iter().map(|t| t.raw.clone()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), Value::Object(arguments)));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let pending_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if pending_failure {
            return Err(ToolError::Invocation("temporarily unavailable".into()));
        }

        self.tools
            .iter()
            .find(|t| t.raw.name == name)
            .map(|t| t.reply.clone())
            .unwrap_or_else(|| Err(ToolError::Unresolved(name.to_string())))
    }

    async fn shutdown(self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// What a [`ScriptedBackend`] was asked.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub tool_choice: ToolChoice,
}

/// A backend replaying scripted replies in order.
///
/// Once the script runs out, the fallback reply (if any) repeats forever.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Message>>,
    fallback: Option<Message>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A backend that gives the same reply to every request.
    pub fn always(reply: Message) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
            tool_choice: request.tool_choice,
        });

        let next = self.replies.lock().unwrap().pop_front();
        let message = next
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| ModelError::InvalidResponse("script exhausted".into()))?;

        let finish_reason = if message.tool_calls().is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        };
        Ok(ModelResponse {
            message,
            finish_reason,
            usage: Usage::default(),
        })
    }
}

pub fn text_reply(text: &str) -> Message {
    Message::model(vec![Part::Text(text.to_string())])
}

pub fn tool_reply(id: &str, name: &str, input: Value) -> Message {
    Message::model(vec![Part::ToolCall(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        input,
    })])
}
