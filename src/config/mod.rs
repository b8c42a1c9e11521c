//! Configuration management.

mod settings;

use std::path::{Path, PathBuf};

use agent_protocol::OpeningDelta;
use serde::{Deserialize, Serialize};

use crate::core::keychain;

pub use settings::{
    ClientSettings, DEFAULT_ANTHROPIC_BASE_URL, KeySetting, Provider, ResolvedSettings,
    ServerCapabilities, ServerKeys,
};

/// Environment variables that mark a hosted deployment.
const CLOUD_MARKERS: &[(&str, Option<&str>)] = &[
    ("DEPLOY_ENV", Some("cloud")),
    ("VERCEL", Some("1")),
    ("RAILWAY_ENVIRONMENT", None),
    ("RENDER", Some("true")),
    ("FLY_APP_NAME", None),
    ("HEROKU_APP_NAME", None),
];

/// Whether the process runs on a hosting platform, judged by `lookup`.
///
/// A marker with an expected value must match it exactly; one without only
/// needs to be present.
pub fn is_cloud_environment(lookup: impl Fn(&str) -> Option<String>) -> bool {
    CLOUD_MARKERS.iter().any(|&(name, expected)| {
        lookup(name).is_some_and(|value| expected.is_none_or(|e| value == e))
    })
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub agent: AgentConfig,
    pub sandbox: SandboxConfig,
    pub providers: ProvidersConfig,
}

impl Config {
    /// Load the global config, then merge the project-local one over it.
    pub fn load() -> anyhow::Result<Self> {
        let project = Self::project_config_path().ok();
        Self::load_from(&Self::config_path()?, project.as_deref())
    }

    /// Load from explicit paths. Missing files are skipped.
    pub fn load_from(global: &Path, project: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = if global.exists() {
            let contents = std::fs::read_to_string(global)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Some(project) = project.filter(|p| p.exists()) {
            let contents = std::fs::read_to_string(project)?;
            let project_config: Self = toml::from_str(&contents)?;
            config.merge(project_config);
        }

        Ok(config)
    }

    /// `.agent-chat/config.toml` in the current directory.
    pub fn project_config_path() -> anyhow::Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(".agent-chat").join("config.toml"))
    }

    /// Merge another config into this one (project overrides global).
    fn merge(&mut self, other: Self) {
        let server = ServerConfig::default();
        if other.server.host != server.host {
            self.server.host = other.server.host;
        }
        if other.server.port != server.port {
            self.server.port = other.server.port;
        }

        let agent = AgentConfig::default();
        if other.agent.upstream.is_some() {
            self.agent.upstream = other.agent.upstream;
        }
        if other.agent.replay.is_some() {
            self.agent.replay = other.agent.replay;
        }
        if other.agent.opening_delta != agent.opening_delta {
            self.agent.opening_delta = other.agent.opening_delta;
        }
        if other.agent.max_steps != agent.max_steps {
            self.agent.max_steps = other.agent.max_steps;
        }

        let sandbox = SandboxConfig::default();
        if other.sandbox.workspace != sandbox.workspace {
            self.sandbox.workspace = other.sandbox.workspace;
        }
        if other.sandbox.mode != sandbox.mode {
            self.sandbox.mode = other.sandbox.mode;
        }

        let providers = ProvidersConfig::default();
        if other.providers.anthropic != providers.anthropic {
            self.providers.anthropic = other.providers.anthropic;
        }
        if other.providers.openai != providers.openai {
            self.providers.openai = other.providers.openai;
        }
        if other.providers.tavily != providers.tavily {
            self.providers.tavily = other.providers.tavily;
        }
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// The config directory (`~/.config/agent-chat/`).
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home).join("agent-chat"));
        }

        if cfg!(target_os = "macos") {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home).join(".config").join("agent-chat"));
            }
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join("agent-chat"))
    }

    /// Whether sessions get cloud sandboxes.
    #[must_use]
    pub fn use_cloud_sandbox(&self) -> bool {
        match self.sandbox.mode {
            SandboxMode::Local => false,
            SandboxMode::Cloud => true,
            SandboxMode::Auto => is_cloud_environment(|name| std::env::var(name).ok()),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7890,
        }
    }
}

impl ServerConfig {
    /// Base URL clients use to reach this server.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Agent backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Upstream agent service receiving run requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,

    /// JSON-lines file of recorded events to replay instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<PathBuf>,

    /// Whether the text event that opens a span also emits its payload.
    pub opening_delta: OpeningDelta,

    /// Step limit passed to the agent.
    pub max_steps: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            replay: None,
            opening_delta: OpeningDelta::Emit,
            max_steps: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxMode {
    /// Cloud on hosting platforms, local elsewhere.
    #[default]
    Auto,
    Local,
    Cloud,
}

/// Sandbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Parent directory of per-session local workspaces.
    pub workspace: PathBuf,
    pub mode: SandboxMode,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from(".sandbox-workspace"),
            mode: SandboxMode::Auto,
        }
    }
}

/// Credential lookup for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable holding the key.
    pub api_key_env: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable overriding `base_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_env: Option<String>,
}

impl ProviderConfig {
    fn env(api_key_env: &str) -> Self {
        Self {
            api_key_env: api_key_env.to_string(),
            base_url: None,
            base_url_env: None,
        }
    }

    /// Environment first, then the OS keychain.
    pub(crate) fn resolve_api_key(&self, provider_name: &str) -> Option<String> {
        // Env first avoids keychain prompts for freshly built binaries on macOS.
        if let Ok(key) = std::env::var(&self.api_key_env) {
            if !key.is_empty() {
                return Some(key);
            }
        }

        keychain::get_api_key(provider_name)
    }

    fn resolve_base_url(&self) -> Option<String> {
        self.base_url_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|url| !url.is_empty())
            .or_else(|| self.base_url.clone())
    }
}

/// Provider credential sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: ProviderConfig,
    pub openai: ProviderConfig,
    pub tavily: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: ProviderConfig {
                base_url_env: Some("ANTHROPIC_BASE_URL".to_string()),
                ..ProviderConfig::env("ANTHROPIC_API_KEY")
            },
            openai: ProviderConfig::env("OPENAI_API_KEY"),
            tavily: ProviderConfig::env("TAVILY_API_KEY"),
        }
    }
}

impl ProvidersConfig {
    /// Resolve every key the server holds.
    #[must_use]
    pub fn server_keys(&self) -> ServerKeys {
        ServerKeys {
            anthropic: self.anthropic.resolve_api_key("anthropic"),
            anthropic_base_url: self
                .anthropic
                .resolve_base_url()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            openai: self.openai.resolve_api_key("openai"),
            tavily: self.tavily.resolve_api_key("tavily"),
        }
    }
}
