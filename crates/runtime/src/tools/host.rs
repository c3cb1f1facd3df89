//! Tool host: connected providers plus the merged registry.

use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{
    Resolution, RetryPolicy, ToolDescriptor, ToolError, ToolProvider, ToolRegistry,
};
use crate::model::{ToolCall, ToolResult, ToolSpec};
use crate::{Error, Result};

/// Limits applied to every tool invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationSettings {
    /// Per-attempt timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

/// Owns the providers of a session and routes tool calls to them.
pub struct ToolHost<P> {
    providers: Vec<P>,
    registry: ToolRegistry,
    specs: Vec<ToolSpec>,
    settings: InvocationSettings,
}

impl<P: ToolProvider> ToolHost<P> {
    pub fn new(settings: InvocationSettings) -> Self {
        Self {
            providers: Vec::new(),
            registry: ToolRegistry::default(),
            specs: Vec::new(),
            settings,
        }
    }

    /// Set how suffix-only tool names are resolved.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.registry = ToolRegistry::new(resolution);
        self
    }

    /// Register a connected provider's tools and take ownership of it.
    ///
    /// On failure the provider is shut down before the error is returned.
    pub async fn attach(&mut self, provider: P) -> Result<Vec<ToolDescriptor>> {
        let provider_id = provider.id().to_string();

        let raw_tools = match provider.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                provider.shutdown().await;
                return Err(Error::ProviderConnection {
                    provider: provider_id,
                    reason: e.to_string(),
                });
            }
        };

        let descriptors = match self.registry.register(&provider_id, raw_tools) {
            Ok(descriptors) => descriptors,
            Err(e) => {
                provider.shutdown().await;
                return Err(e.into());
            }
        };

        self.specs
            .extend(descriptors.iter().map(ToolDescriptor::spec));
        self.providers.push(provider);
        info!(provider = %provider_id, tools = descriptors.len(), "provider attached");
        Ok(descriptors)
    }

    /// Connect and attach providers one at a time, in order.
    ///
    /// If any provider fails to connect or register, every provider
    /// attached so far is shut down and the error is returned.
    pub async fn connect_all<C, F, Fut>(
        mut self,
        configs: impl IntoIterator<Item = C>,
        mut connect: F,
    ) -> Result<Self>
    where
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Result<P>>,
    {
        for config in configs {
            let attached = match connect(config).await {
                Ok(provider) => self.attach(provider).await.map(drop),
                Err(e) => Err(e),
            };
            if let Err(e) = attached {
                warn!(error = %e, connected = self.providers.len(), "startup aborted, releasing providers");
                self.shutdown().await;
                return Err(e);
            }
        }
        Ok(self)
    }

    /// Normalized tool catalog, in registration order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn providers(&self) -> &[P] {
        &self.providers
    }

    /// Execute a model-issued tool call.
    ///
    /// Never fails: resolution and execution errors become a failure result.
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        match self.try_invoke(call).await {
            Ok(output) => {
                debug!(tool = %call.name, bytes = output.len(), "tool call succeeded");
                ToolResult::success(call, output)
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                ToolResult::failure(call, e.to_string())
            }
        }
    }

    async fn try_invoke(&self, call: &ToolCall) -> std::result::Result<String, ToolError> {
        let descriptor = self.registry.resolve(&call.name)?;
        let provider = self
            .providers
            .iter()
            .find(|p| p.id() == descriptor.provider_id)
            .ok_or_else(|| ToolError::Unresolved(call.name.clone()))?;
        let arguments = &arguments_from(&call.input)?;

        info!(
            tool = %descriptor.qualified_name,
            provider = %descriptor.provider_id,
            "calling tool"
        );

        let host = self;
        let name = descriptor.original_name.as_str();
        self.settings
            .retry
            .run(move || {
                let arguments = arguments.clone();
                async move { host.call_once(provider, name, arguments).await }
            })
            .await
    }

    async fn call_once(
        &self,
        provider: &P,
        name: &str,
        arguments: Map<String, Value>,
    ) -> std::result::Result<String, ToolError> {
        let call = provider.call_tool(name, arguments);
        match self.settings.timeout {
            Some(limit) => timeout(limit, call)
                .await
                .map_err(|_| ToolError::Timeout(limit.as_millis() as u64))?,
            None => call.await,
        }
    }

    /// Shut down every provider, in attach order.
    pub async fn shutdown(self) {
        for provider in self.providers {
            let id = provider.id().to_string();
            provider.shutdown().await;
            debug!(provider = %id, "provider released");
        }
    }
}

/// Tool arguments must be a JSON object; a missing value means no arguments.
fn arguments_from(input: &Value) -> std::result::Result<Map<String, Value>, ToolError> {
    match input {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(ToolError::InvalidInput(format!(
            "expected an object of arguments, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolOutcome;
    use crate::testing::FakeProvider;
    use serde_json::json;

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: "call-1".into(),
            name: name.into(),
            input,
        }
    }

    async fn host_with(providers: Vec<FakeProvider>) -> ToolHost<FakeProvider> {
        let mut host = ToolHost::new(InvocationSettings::default());
        for provider in providers {
            host.attach(provider).await.unwrap();
        }
        host
    }

    #[tokio::test]
    async fn routes_call_to_owning_provider() {
        let host = host_with(vec![
            FakeProvider::new("calendar").tool("create_event", "Event created."),
            FakeProvider::new("media").tool("play", "Playing."),
        ])
        .await;

        let result = host
            .invoke(&call("media_play", json!({"track": "Blue in Green"})))
            .await;
        assert_eq!(result.outcome.to_response(), json!({"result": "Playing."}));
        assert_eq!(result.name, "media_play");

        let media = &host.providers()[1];
        assert_eq!(
            media.calls(),
            vec![("play".to_string(), json!({"track": "Blue in Green"}))]
        );
        assert!(host.providers()[0].calls().is_empty());
    }

    #[tokio::test]
    async fn specs_are_qualified_and_normalized() {
        let host = host_with(vec![FakeProvider::new("calendar").tool_with_schema(
            "create_event",
            json!({"title": "Args", "type": "object", "properties": {"summary": {"title": "S", "type": "string"}}}),
            "ok",
        )])
        .await;

        let specs = host.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "calendar_create_event");
        assert_eq!(
            specs[0].schema,
            json!({"type": "object", "properties": {"summary": {"type": "string"}}})
        );
    }

    #[tokio::test]
    async fn unresolved_tool_becomes_error_result() {
        let host = host_with(vec![FakeProvider::new("media").tool("play", "Playing.")]).await;

        let result = host.invoke(&call("rewind", Value::Null)).await;
        assert!(result.outcome.is_error());
        assert_eq!(
            result.outcome,
            ToolOutcome::Failure {
                error: "unknown tool: rewind".into()
            }
        );
    }

    #[tokio::test]
    async fn provider_failure_becomes_error_result() {
        let host = host_with(vec![
            FakeProvider::new("media").failing_tool("play", "no active device"),
        ])
        .await;

        let result = host.invoke(&call("media_play", json!({}))).await;
        assert_eq!(
            result.outcome.to_response(),
            json!({"error": "execution failed: no active device"})
        );
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let host = host_with(vec![FakeProvider::new("media").tool("play", "Playing.")]).await;

        let result = host.invoke(&call("media_play", json!(["x"]))).await;
        assert!(result.outcome.is_error());
        assert!(host.providers()[0].calls().is_empty());
    }

    #[tokio::test]
    async fn retries_transient_provider_failures() {
        let settings = InvocationSettings {
            timeout: None,
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff_ms: 0,
                ..RetryPolicy::default()
            },
        };
        let mut host = ToolHost::new(settings);
        host.attach(FakeProvider::new("media").tool("play", "Playing.").fail_first(2))
            .await
            .unwrap();

        let result = host.invoke(&call("play", Value::Null)).await;
        assert!(!result.outcome.is_error());
        assert_eq!(host.providers()[0].calls().len(), 3);
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let settings = InvocationSettings {
            timeout: Some(Duration::from_millis(20)),
            retry: RetryPolicy::none(),
        };
        let mut host = ToolHost::new(settings);
        host.attach(
            FakeProvider::new("shell")
                .tool("run_command", "done")
                .delay(Duration::from_secs(5)),
        )
        .await
        .unwrap();

        let result = host.invoke(&call("shell_run_command", json!({}))).await;
        assert_eq!(
            result.outcome,
            ToolOutcome::Failure {
                error: "timeout after 20ms".into()
            }
        );
    }

    #[tokio::test]
    async fn colliding_provider_is_rejected_and_released() {
        let mut host = ToolHost::new(InvocationSettings::default());
        host.attach(FakeProvider::new("media").tool("play", "a"))
            .await
            .unwrap();

        let second = FakeProvider::new("media").tool("stop", "b");
        let released = second.released_flag();
        let err = host.attach(second).await.unwrap_err();

        assert!(matches!(err, Error::Registry(_)));
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(host.providers().len(), 1);
        assert_eq!(host.specs().len(), 1);
    }

    #[tokio::test]
    async fn listing_failure_is_a_connection_error() {
        let mut host = ToolHost::new(InvocationSettings::default());
        let err = host
            .attach(FakeProvider::new("calendar").failing_listing("token expired"))
            .await
            .unwrap_err();
        match err {
            Error::ProviderConnection { provider, reason } => {
                assert_eq!(provider, "calendar");
                assert!(reason.contains("token expired"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn spawn_failure(name: &str) -> Error {
        Error::ProviderConnection {
            provider: name.to_string(),
            reason: "spawn failed".into(),
        }
    }

    #[tokio::test]
    async fn connect_all_attaches_in_order() {
        let providers = vec![
            FakeProvider::new("calendar").tool("create_event", "ok"),
            FakeProvider::new("media").tool("play", "ok"),
        ];
        let host = ToolHost::new(InvocationSettings::default())
            .connect_all(providers, |provider| async move { Ok(provider) })
            .await
            .unwrap();

        let names: Vec<&str> = host.specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["calendar_create_event", "media_play"]);
    }

    #[tokio::test]
    async fn failed_connection_releases_connected_providers() {
        let calendar = FakeProvider::new("calendar").tool("create_event", "ok");
        let media = FakeProvider::new("media").tool("play", "ok");
        let flags = [calendar.released_flag(), media.released_flag()];

        let pending = vec![
            ("calendar", Some(calendar)),
            ("media", Some(media)),
            ("terminal", None),
        ];
        let result = ToolHost::new(InvocationSettings::default())
            .connect_all(pending, |(name, provider)| async move {
                provider.ok_or_else(|| spawn_failure(name))
            })
            .await;

        match result {
            Err(Error::ProviderConnection { provider, .. }) => assert_eq!(provider, "terminal"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connection should have failed"),
        }
        assert!(flags.iter().all(|f| f.load(std::sync::atomic::Ordering::SeqCst)));
    }

    #[tokio::test]
    async fn collision_during_connect_releases_everything() {
        let first = FakeProvider::new("media").tool("play", "a");
        let second = FakeProvider::new("media").tool("stop", "b");
        let flags = [first.released_flag(), second.released_flag()];

        let result = ToolHost::new(InvocationSettings::default())
            .connect_all(vec![first, second], |provider| async move { Ok(provider) })
            .await;

        assert!(matches!(result, Err(Error::Registry(_))));
        assert!(flags.iter().all(|f| f.load(std::sync::atomic::Ordering::SeqCst)));
    }

    #[tokio::test]
    async fn shutdown_releases_every_provider() {
        let calendar = FakeProvider::new("calendar");
        let media = FakeProvider::new("media");
        let flags = [calendar.released_flag(), media.released_flag()];

        let host = host_with(vec![calendar, media]).await;
        host.shutdown().await;

        assert!(flags.iter().all(|f| f.load(std::sync::atomic::Ordering::SeqCst)));
    }
}
