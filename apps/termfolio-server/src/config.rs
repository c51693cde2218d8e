//! Server configuration.
//!
//! Layered with `figment`: defaults, then an optional TOML file, then
//! `TERMFOLIO_*` environment variables (nested keys split on `__`), then
//! command-line overrides.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use termfolio_backend::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, REQUEST_TIMEOUT};
use termfolio_core::Conversation;

/// Config file read from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "termfolio.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TERMFOLIO_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Portfolio JSON; the built-in profile is used when unset.
    pub profile: Option<PathBuf>,
    /// Turns of chat history kept per session.
    pub max_history_turns: usize,
    pub backend: BackendConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            profile: None,
            max_history_turns: Conversation::DEFAULT_MAX_TURNS,
            backend: BackendConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from every layer.
    ///
    /// # Errors
    /// Returns error if a layer holds a value of the wrong type.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, Box<figment::Error>> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(Box::new)
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which conversational backend serves `CHAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Gemini,
    Scripted,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Inline key; takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Replaces the profile's system prompt.
    pub system_prompt: Option<String>,
    /// Limit on one chat request, in seconds.
    pub request_timeout_secs: u64,
    /// Reply streamed word by word by the scripted backend.
    pub scripted_reply: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            system_prompt: None,
            request_timeout_secs: REQUEST_TIMEOUT.as_secs(),
            scripted_reply: "Chat is running in offline mode. Try HELP to explore the portfolio."
                .to_string(),
        }
    }
}

impl BackendConfig {
    /// The API key, from config or the environment. Blank keys count as unset.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Command-line values layered over everything else.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<PathBuf>,
}
