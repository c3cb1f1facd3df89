//! Configuration loading from switchboard.toml.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use runtime::{
    DEFAULT_ANTHROPIC_MODEL, DEFAULT_GEMINI_MODEL, DEFAULT_MAX_ROUNDS, DEFAULT_MAX_TOKENS,
    DispatchSettings, GenerationConfig, InvocationSettings, Resolution, RetryPolicy,
};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Tool servers, connected in the order listed.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Which model backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Anthropic,
}

impl Provider {
    /// Environment variable holding the API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_MODEL,
            Self::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub provider: Provider,
    /// Model name. Defaults per provider.
    pub name: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            name: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            top_p: None,
        }
    }
}

impl ModelConfig {
    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            model: self
                .name
                .clone()
                .unwrap_or_else(|| self.provider.default_model().to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    pub max_rounds: u32,
    /// Exchanges remembered across queries; 0 disables history.
    pub history: usize,
    pub tool_timeout_secs: u64,
    pub model_timeout_secs: u64,
    pub resolution: Resolution,
    pub retry: RetryPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            history: 5,
            tool_timeout_secs: 60,
            model_timeout_secs: 120,
            resolution: Resolution::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl DispatchConfig {
    pub fn settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_rounds: self.max_rounds,
            model_timeout: Some(Duration::from_secs(self.model_timeout_secs)),
        }
    }

    pub fn invocation(&self) -> InvocationSettings {
        InvocationSettings {
            timeout: Some(Duration::from_secs(self.tool_timeout_secs)),
            retry: self.retry.clone(),
        }
    }
}

/// One tool server process.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Namespace for the server's tools.
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Variables that must be set in our environment; forwarded to the server.
    #[serde(default)]
    pub required_env: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.max_rounds == 0 {
            return Err(ConfigError::Invalid("dispatch.max_rounds must be at least 1".into()));
        }
        if self.dispatch.tool_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.tool_timeout_secs must be at least 1".into(),
            ));
        }
        if self.dispatch.model_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.model_timeout_secs must be at least 1".into(),
            ));
        }
        if self.dispatch.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.retry.max_attempts must be at least 1".into(),
            ));
        }

        let mut seen = Vec::new();
        for provider in &self.providers {
            if provider.name.is_empty() {
                return Err(ConfigError::Invalid("provider name must not be empty".into()));
            }
            if provider.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}' has no command",
                    provider.name
                )));
            }
            if seen.contains(&provider.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}' is listed twice",
                    provider.name
                )));
            }
            seen.push(provider.name.as_str());
        }
        Ok(())
    }

    /// The model API key, looked up with `lookup`.
    pub fn api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        let var = self.model.provider.api_key_var();
        lookup(var)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv {
                var: var.to_string(),
                needed_by: "model".to_string(),
            })
    }

    /// Server configs with each provider's required variables filled in.
    pub fn server_configs_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<mcp::ServerConfig>, ConfigError> {
        self.providers
            .iter()
            .map(|provider| {
                let mut env = provider.env.clone();
                for var in &provider.required_env {
                    let value = lookup(var).filter(|v| !v.is_empty()).ok_or_else(|| {
                        ConfigError::MissingEnv {
                            var: var.clone(),
                            needed_by: provider.name.clone(),
                        }
                    })?;
                    env.insert(var.clone(), value);
                }
                Ok(mcp::ServerConfig {
                    name: provider.name.clone(),
                    command: provider.command.clone(),
                    args: provider.args.clone(),
                    env,
                    working_dir: provider.working_dir.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("environment variable {var} is not set (needed by {needed_by})")]
    MissingEnv { var: String, needed_by: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [model]
        provider = "anthropic"
        temperature = 0.2

        [dispatch]
        max_rounds = 4
        history = 0
        resolution = "strict"

        [dispatch.retry]
        max_attempts = 3
        initial_backoff_ms = 250

        [[providers]]
        name = "calendar"
        command = "python3"
        args = ["server/calendar-server.py"]
        required_env = ["GOOGLE_CALENDAR_ID"]

        [[providers]]
        name = "terminal"
        command = "uv"
        args = ["run", "terminal-server.py"]
        working_dir = "/srv/workspace"
        env = { SHELL = "/bin/zsh" }
    "#;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.model.provider, Provider::Gemini);
        assert_eq!(config.model.generation().model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.dispatch.max_rounds, 3);
        assert_eq!(config.dispatch.history, 5);
        assert_eq!(config.dispatch.resolution, Resolution::FirstMatch);
        assert_eq!(config.dispatch.retry, RetryPolicy::default());
        assert_eq!(
            config.dispatch.settings().model_timeout,
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            config.dispatch.invocation().timeout,
            Some(Duration::from_secs(60))
        );
        assert!(config.providers.is_empty());
    }

    #[test]
    fn parses_full_config() {
        let config = Config::parse(SAMPLE).unwrap();

        let generation = config.model.generation();
        assert_eq!(generation.model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(generation.temperature, Some(0.2));
        assert_eq!(generation.max_tokens, DEFAULT_MAX_TOKENS);

        assert_eq!(config.dispatch.max_rounds, 4);
        assert_eq!(config.dispatch.history, 0);
        assert_eq!(config.dispatch.resolution, Resolution::Strict);
        assert_eq!(config.dispatch.retry.max_attempts, 3);
        assert_eq!(config.dispatch.retry.initial_backoff_ms, 250);
        assert_eq!(config.dispatch.retry.multiplier, 2.0);

        let names: Vec<&str> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["calendar", "terminal"]);
        assert_eq!(
            config.providers[1].working_dir,
            Some(PathBuf::from("/srv/workspace"))
        );
    }

    #[test]
    fn required_env_is_forwarded() {
        let config = Config::parse(SAMPLE).unwrap();
        let servers = config
            .server_configs_with(env(&[("GOOGLE_CALENDAR_ID", "primary")]))
            .unwrap();

        assert_eq!(servers[0].env.get("GOOGLE_CALENDAR_ID").unwrap(), "primary");
        assert_eq!(servers[1].env.get("SHELL").unwrap(), "/bin/zsh");
        assert_eq!(servers[1].args, vec!["run", "terminal-server.py"]);
    }

    #[test]
    fn missing_required_env_is_fatal() {
        let config = Config::parse(SAMPLE).unwrap();
        let err = config.server_configs_with(env(&[])).unwrap_err();
        match err {
            ConfigError::MissingEnv { var, needed_by } => {
                assert_eq!(var, "GOOGLE_CALENDAR_ID");
                assert_eq!(needed_by, "calendar");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn api_key_comes_from_provider_variable() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(
            config
                .api_key_with(env(&[("ANTHROPIC_API_KEY", "sk-test")]))
                .unwrap(),
            "sk-test"
        );
        assert!(matches!(
            config.api_key_with(env(&[("GEMINI_API_KEY", "g")])),
            Err(ConfigError::MissingEnv { .. })
        ));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Config::parse("[dispatch]\nmax_rounds = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::parse(
                "[[providers]]\nname = \"media\"\ncommand = \"a\"\n[[providers]]\nname = \"media\"\ncommand = \"b\""
            ),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::parse("[model]\nprovider = \"openai\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::parse("[dispatch]\nmax_round = 2"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_zero_timeouts() {
        for field in ["tool_timeout_secs", "model_timeout_secs"] {
            let err = Config::parse(&format!("[dispatch]\n{field} = 0")).unwrap_err();
            match err {
                ConfigError::Invalid(message) => assert!(message.contains(field)),
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(Config::parse("[dispatch]\ntool_timeout_secs = 1\nmodel_timeout_secs = 1").is_ok());
    }
}
