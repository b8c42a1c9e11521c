//! Per-request model and credential settings.
//!
//! The client owns a [`ClientSettings`] and sends it with every chat
//! request. Each credential says explicitly where it comes from; the server
//! resolves `server-default` entries against its own keys.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Model vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    #[value(name = "openai")]
    OpenAi,
}

impl Provider {
    /// Model selected when switching to this provider.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic/claude-sonnet-4-5-20250929",
            Self::OpenAi => "openai/gpt-4.1",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a credential comes from.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum KeySetting {
    /// Use the key configured on the server.
    ServerDefault,
    /// Use this key.
    User { value: String },
    #[default]
    Unset,
}

impl KeySetting {
    pub fn user(value: impl Into<String>) -> Self {
        Self::User {
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// Point at the server key when the user has not supplied one.
    fn adopt_server(&mut self, server_has_key: bool) {
        if self.is_user() {
            return;
        }
        *self = if server_has_key {
            Self::ServerDefault
        } else {
            Self::Unset
        };
    }

    fn resolve(&self, server: Option<&str>) -> Option<String> {
        match self {
            Self::ServerDefault => server.map(str::to_string),
            Self::User { value } if !value.is_empty() => Some(value.clone()),
            Self::User { .. } | Self::Unset => None,
        }
    }
}

impl fmt::Debug for KeySetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerDefault => f.write_str("ServerDefault"),
            Self::User { .. } => f.write_str("User(****)"),
            Self::Unset => f.write_str("Unset"),
        }
    }
}

/// Settings chosen on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    pub provider: Provider,
    pub model: String,
    pub anthropic_api_key: KeySetting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_base_url: Option<String>,
    pub openai_api_key: KeySetting,
    pub tavily_api_key: KeySetting,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            model: Provider::Anthropic.default_model().to_string(),
            anthropic_api_key: KeySetting::ServerDefault,
            anthropic_base_url: None,
            openai_api_key: KeySetting::ServerDefault,
            tavily_api_key: KeySetting::ServerDefault,
        }
    }
}

impl ClientSettings {
    /// Switch provider, resetting the model to that provider's default.
    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
        self.model = provider.default_model().to_string();
    }

    /// Align non-user keys with what the server actually has.
    ///
    /// Keys the user typed in are left alone; everything else becomes
    /// `server-default` when the server holds that key, `unset` otherwise.
    pub fn apply_server_defaults(&mut self, server: &ServerCapabilities) {
        self.anthropic_api_key.adopt_server(server.has_anthropic_api_key);
        self.openai_api_key.adopt_server(server.has_openai_api_key);
        self.tavily_api_key.adopt_server(server.has_tavily_api_key);
        if self.anthropic_base_url.is_none() {
            self.anthropic_base_url = Some(server.anthropic_base_url.clone());
        }
    }

    /// Whether a key for `provider` will be available to the agent.
    #[must_use]
    pub const fn has_api_key(&self, provider: Provider) -> bool {
        let setting = match provider {
            Provider::Anthropic => &self.anthropic_api_key,
            Provider::OpenAi => &self.openai_api_key,
        };
        !matches!(setting, KeySetting::Unset)
    }

    /// Resolve every key against the server's own.
    #[must_use]
    pub fn resolve(&self, server: &ServerKeys) -> ResolvedSettings {
        ResolvedSettings {
            provider: self.provider,
            model: self.model.clone(),
            anthropic_api_key: self.anthropic_api_key.resolve(server.anthropic.as_deref()),
            anthropic_base_url: self
                .anthropic_base_url
                .clone()
                .unwrap_or_else(|| server.anthropic_base_url.clone()),
            openai_api_key: self.openai_api_key.resolve(server.openai.as_deref()),
            tavily_api_key: self.tavily_api_key.resolve(server.tavily.as_deref()),
        }
    }
}

/// Keys held by the server process.
#[derive(Clone, Default)]
pub struct ServerKeys {
    pub anthropic: Option<String>,
    pub anthropic_base_url: String,
    pub openai: Option<String>,
    pub tavily: Option<String>,
}

impl fmt::Debug for ServerKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerKeys")
            .field("anthropic", &self.anthropic.is_some())
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("openai", &self.openai.is_some())
            .field("tavily", &self.tavily.is_some())
            .finish()
    }
}

/// Which keys the server holds, without revealing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    pub has_anthropic_api_key: bool,
    pub anthropic_base_url: String,
    pub has_tavily_api_key: bool,
    pub has_openai_api_key: bool,
}

impl From<&ServerKeys> for ServerCapabilities {
    fn from(keys: &ServerKeys) -> Self {
        Self {
            has_anthropic_api_key: keys.anthropic.is_some(),
            anthropic_base_url: keys.anthropic_base_url.clone(),
            has_tavily_api_key: keys.tavily.is_some(),
            has_openai_api_key: keys.openai.is_some(),
        }
    }
}

/// Settings with every key resolved, as handed to the agent backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSettings {
    pub provider: Provider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,
}

impl ResolvedSettings {
    /// Key for the selected provider.
    #[must_use]
    pub fn provider_key(&self) -> Option<&str> {
        match self.provider {
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
            Provider::OpenAi => self.openai_api_key.as_deref(),
        }
    }
}

impl fmt::Debug for ResolvedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("anthropic_api_key", &self.anthropic_api_key.is_some())
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("openai_api_key", &self.openai_api_key.is_some())
            .field("tavily_api_key", &self.tavily_api_key.is_some())
            .finish()
    }
}
