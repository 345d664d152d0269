//! Configuration loading from clerk.toml.

use runtime::providers::{AnthropicBackend, GeminiBackend, Provider};
use runtime::{AgentConfig, DEFAULT_SYSTEM_PROMPT};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tools::ToolsConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub tools: ToolsSection,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// "gemini" or "anthropic".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model to use; the provider's default when unset.
    pub model: Option<String>,

    /// API key. Falls back to the provider's environment variable.
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Alternative endpoint (proxies, gateways).
    pub base_url: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            base_url: None,
        }
    }
}

/// Loop bounds and timeouts. Missing keys keep their defaults.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSection {
    pub max_iterations: u32,
    pub max_parse_retries: u32,
    pub model_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub system_prompt: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        let defaults = AgentConfig::default();
        Self {
            max_iterations: defaults.max_iterations,
            max_parse_retries: defaults.max_parse_retries,
            model_timeout_secs: defaults.model_timeout.as_secs(),
            tool_timeout_secs: defaults.tool_timeout.as_secs(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Which tools to offer the model.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,

    #[serde(default = "default_tax_rate")]
    pub default_tax_rate: f64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            default_tax_rate: default_tax_rate(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_enabled() -> Vec<String> {
    tools::ALL.iter().map(|s| s.to_string()).collect()
}

fn default_tax_rate() -> f64 {
    tools::DEFAULT_RATE
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.tools.default_tax_rate;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tools.default_tax_rate must be a non-negative number, got {rate}"
            )));
        }
        Ok(())
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_iterations: self.agent.max_iterations,
            max_parse_retries: self.agent.max_parse_retries,
            model_timeout: Duration::from_secs(self.agent.model_timeout_secs),
            tool_timeout: Duration::from_secs(self.agent.tool_timeout_secs),
        }
    }

    pub fn tools_config(&self) -> ToolsConfig {
        ToolsConfig::new()
            .enabled(self.tools.enabled.iter().cloned())
            .default_tax_rate(self.tools.default_tax_rate)
            .http_timeout(Duration::from_secs(self.agent.tool_timeout_secs))
    }

    /// The model name, honoring `CLERK_MODEL`.
    pub fn model(&self, env: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        if let Some(model) = env("CLERK_MODEL").filter(|m| !m.is_empty()) {
            return Ok(model);
        }
        if let Some(model) = &self.backend.model {
            return Ok(model.clone());
        }
        Provider::default_model(&self.backend.provider)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::UnknownProvider(self.backend.provider.clone()))
    }

    /// The API key: from the file, or the provider's environment variables.
    pub fn api_key(&self, env: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        if let Some(key) = &self.backend.api_key {
            return Ok(key.clone());
        }
        let vars: &'static [&'static str] = match self.backend.provider.as_str() {
            "anthropic" => &["ANTHROPIC_API_KEY"],
            "gemini" => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };
        vars.iter()
            .copied()
            .find_map(|var| env(var).filter(|v| !v.is_empty()))
            .ok_or(ConfigError::MissingApiKey { vars })
    }

    /// Build the configured model provider.
    pub fn provider(&self, env: impl Fn(&str) -> Option<String>) -> Result<Provider, ConfigError> {
        let model = self.model(&env)?;
        let api_key = self.api_key(&env)?;
        let backend = &self.backend;

        let provider = match backend.provider.as_str() {
            "anthropic" => {
                let mut builder =
                    AnthropicBackend::builder(api_key, model).max_tokens(backend.max_tokens);
                if let Some(url) = &backend.base_url {
                    builder = builder.base_url(url);
                }
                Provider::from(builder.build())
            }
            "gemini" => {
                let mut builder =
                    GeminiBackend::builder(api_key, model).max_tokens(backend.max_tokens);
                if let Some(url) = &backend.base_url {
                    builder = builder.base_url(url);
                }
                Provider::from(builder.build())
            }
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };
        Ok(provider)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("unknown provider `{0}` (expected \"gemini\" or \"anthropic\")")]
    UnknownProvider(String),

    #[error("API key not configured: set backend.api_key or {}", vars.join(" / "))]
    MissingApiKey { vars: &'static [&'static str] },
}
