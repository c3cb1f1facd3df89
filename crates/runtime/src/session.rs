//! The tool-dispatch loop.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::history::ConversationHistory;
use crate::model::{Backend, Message, ModelRequest, ModelResponse, Part, ToolChoice};
use crate::tools::{ToolHost, ToolProvider};
use crate::{Error, Result};

/// Rounds of tool use allowed per query before a final answer is forced.
pub const DEFAULT_MAX_ROUNDS: u32 = 3;

/// Returned when the forced final generation produces no text.
pub const INCOMPLETE_ANSWER: &str =
    "I couldn't finish that request within the allowed number of tool rounds.";

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Values below 1 are treated as 1.
    pub max_rounds: u32,
    /// Limit for each model call. `None` waits indefinitely.
    pub model_timeout: Option<Duration>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            model_timeout: None,
        }
    }
}

/// Result of one dispatched query.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub answer: String,
    /// Every turn exchanged while answering, starting with the prompt.
    pub transcript: Vec<Message>,
    /// Generation rounds used, not counting a forced final call.
    pub rounds: u32,
    /// Whether the round budget ran out and a tool-free answer was forced.
    pub forced_final: bool,
}

/// Per-query state; dropped once the query is answered.
struct DispatchState {
    round: u32,
    transcript: Vec<Message>,
    pending_tool_call: bool,
}

impl DispatchState {
    fn new(prompt: String) -> Self {
        Self {
            round: 0,
            transcript: vec![Message::user(prompt)],
            pending_tool_call: false,
        }
    }

    fn finish(self, answer: String) -> DispatchOutcome {
        DispatchOutcome {
            answer,
            transcript: self.transcript,
            rounds: self.round,
            forced_final: self.pending_tool_call,
        }
    }
}

/// A conversation with a model that can call tools from several providers.
pub struct Session<B, P> {
    backend: B,
    tools: ToolHost<P>,
    settings: DispatchSettings,
    history: Option<ConversationHistory>,
}

impl<B: Backend, P: ToolProvider> Session<B, P> {
    pub fn new(backend: B, tools: ToolHost<P>) -> Self {
        Self {
            backend,
            tools,
            settings: DispatchSettings::default(),
            history: None,
        }
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Remember the last `capacity` exchanges. Zero disables history.
    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history = (capacity > 0).then(|| ConversationHistory::new(capacity));
        self
    }

    pub fn history(&self) -> Option<&ConversationHistory> {
        self.history.as_ref()
    }

    pub fn tools(&self) -> &ToolHost<P> {
        &self.tools
    }

    /// Answer a query and record the exchange in history.
    pub async fn process_query(&mut self, query: &str) -> Result<String> {
        let outcome = self.dispatch(query).await?;
        if let Some(history) = &mut self.history {
            history.append(query, outcome.answer.clone());
        }
        Ok(outcome.answer)
    }

    /// Run the dispatch loop for one query without touching history.
    ///
    /// Tool failures are handed back to the model as results. Only model
    /// errors and timeouts are returned.
    pub async fn dispatch(&self, query: &str) -> Result<DispatchOutcome> {
        let max_rounds = self.settings.max_rounds.max(1);
        let mut state = DispatchState::new(self.initial_prompt(query));

        while state.round < max_rounds {
            state.round += 1;
            let response = self.generate(&state.transcript, ToolChoice::Auto).await?;
            let calls = response.message.tool_calls();

            if calls.is_empty() {
                state.pending_tool_call = false;
                let answer = response.message.text();
                state.transcript.push(response.message);
                debug!(round = state.round, "model answered");
                return Ok(state.finish(answer));
            }

            debug!(round = state.round, calls = calls.len(), "model requested tools");
            state.pending_tool_call = true;
            state.transcript.push(response.message);

            let mut turn = Message::tool();
            for call in &calls {
                let result = self.tools.invoke(call).await;
                turn.parts.push(Part::ToolResult(result));
            }
            state.transcript.push(turn);
        }

        info!(rounds = state.round, "round budget spent, forcing a final answer");
        let response = self.generate(&state.transcript, ToolChoice::None).await?;
        let mut answer = response.message.text();
        if answer.trim().is_empty() {
            warn!("forced final answer was empty");
            answer = INCOMPLETE_ANSWER.to_string();
        }

        let text_only = response
            .message
            .parts
            .into_iter()
            .filter(|part| matches!(part, Part::Text(_)))
            .collect();
        state.transcript.push(Message::model(text_only));
        Ok(state.finish(answer))
    }

    /// Tool guide, history context and the query, as one user turn.
    fn initial_prompt(&self, query: &str) -> String {
        let mut prompt = String::from("Available tools and their arguments:\n");
        for spec in self.tools.specs() {
            let params: Vec<String> = spec
                .parameter_names()
                .iter()
                .map(|name| format!("'{name}'"))
                .collect();
            prompt.push_str(&format!("- {}({})\n", spec.name, params.join(", ")));
        }
        prompt.push_str(
            "\nUse these tools to answer the query. \
             If a tool is needed, call it with the required parameters.\n\n",
        );

        if let Some(history) = &self.history {
            prompt.push_str(&history.render_context());
        }
        prompt.push_str(query);
        prompt
    }

    async fn generate(&self, transcript: &[Message], tool_choice: ToolChoice) -> Result<ModelResponse> {
        let request = ModelRequest {
            messages: transcript,
            tools: self.tools.specs(),
            tool_choice,
        };

        let call = self.backend.call(request);
        let response = match self.settings.model_timeout {
            Some(limit) => timeout(limit, call)
                .await
                .map_err(|_| Error::ModelTimeout(limit))??,
            None => call.await?,
        };

        debug!(
            finish_reason = ?response.finish_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "model responded"
        );
        Ok(response)
    }

    /// Release every tool provider.
    pub async fn shutdown(self) {
        self.tools.shutdown().await;
    }
}
