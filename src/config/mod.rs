//! Configuration: application credentials per provider plus client settings.
//!
//! Sources, in order of typical use:
//! 1. Built in code ([`OAuthConfig::new`] + [`OAuthConfig::insert`])
//! 2. A TOML file (`~/.oauth-relay/clients.toml` by default)
//! 3. Environment variables (with `.env` support)

pub mod client;

pub use client::ClientConfig;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OAuthError;

/// Default safety buffer before expiry at which tokens are refreshed.
pub const DEFAULT_REFRESH_BUFFER_MS: u64 = 10_000;

/// Client-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_refresh_buffer_ms")]
    pub refresh_buffer_ms: u64,
}

fn default_refresh_buffer_ms() -> u64 {
    DEFAULT_REFRESH_BUFFER_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_buffer_ms: DEFAULT_REFRESH_BUFFER_MS,
        }
    }
}

impl Settings {
    pub fn refresh_buffer(&self) -> Duration {
        Duration::from_millis(self.refresh_buffer_ms)
    }
}

/// Full configuration: settings plus one [`ClientConfig`] per provider key.
///
/// # Example
/// ```
/// use oauth_relay::config::OAuthConfig;
///
/// let config = OAuthConfig::from_toml_str(r#"
///     [clients.google]
///     client_id = "1234.apps.googleusercontent.com"
///     client_secret = "shh"
///     redirect_uri = "https://app.example/auth/google"
///     scope = "openid email profile"
/// "#)?;
/// assert_eq!(config.enabled_clients().count(), 1);
/// # Ok::<(), oauth_relay::error::OAuthError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub clients: BTreeMap<String, ClientConfig>,
}

impl OAuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provider: impl Into<String>, client: ClientConfig) -> &mut Self {
        self.clients.insert(provider.into(), client);
        self
    }

    pub fn client(&self, provider: &str) -> Option<&ClientConfig> {
        self.clients.get(provider)
    }

    /// Enabled entries in provider-key order.
    pub fn enabled_clients(&self) -> impl Iterator<Item = (&str, &ClientConfig)> {
        self.clients
            .iter()
            .filter(|(_, client)| client.enabled)
            .map(|(key, client)| (key.as_str(), client))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, OAuthError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml_string(&self) -> Result<String, OAuthError> {
        Ok(toml::to_string(self)?)
    }

    /// Default config file path (`~/.oauth-relay/clients.toml`).
    pub fn default_path() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".oauth-relay"))
            .unwrap_or_else(|| PathBuf::from(".oauth-relay"))
            .join("clients.toml")
    }

    pub fn load_default() -> Result<Self, OAuthError> {
        Self::load_from_path(Self::default_path())
    }

    /// Load from a TOML file. A missing file yields an empty config.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, OAuthError> {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(err) => return Err(OAuthError::Storage(err.to_string())),
        };
        Self::from_toml_str(&raw).map_err(|e| {
            OAuthError::Configuration(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Load from environment variables, reading `.env` first if present.
    ///
    /// `OAUTH_PROVIDERS` lists provider keys (comma separated). For each key
    /// `OAUTH_<KEY>_CLIENT_ID`, `_CLIENT_SECRET`, `_REDIRECT_URI`, `_SCOPE`
    /// and `_ENABLED` are read; `OAUTH_REFRESH_BUFFER_MS` overrides the buffer.
    pub fn from_env() -> Result<Self, OAuthError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OAuthError> {
        let mut config = Self::new();
        if let Some(raw) = lookup("OAUTH_REFRESH_BUFFER_MS") {
            config.settings.refresh_buffer_ms = raw.trim().parse().map_err(|_| {
                OAuthError::Configuration(format!("OAUTH_REFRESH_BUFFER_MS is not a number: {raw}"))
            })?;
        }

        let providers = lookup("OAUTH_PROVIDERS").unwrap_or_default();
        for provider in providers
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            let prefix = format!("OAUTH_{}", env_segment(provider));
            let var = |suffix: &str| lookup(&format!("{prefix}_{suffix}"));
            let client_id = var("CLIENT_ID").ok_or_else(|| {
                OAuthError::Configuration(format!("{prefix}_CLIENT_ID is not set"))
            })?;
            let redirect_uri = var("REDIRECT_URI").ok_or_else(|| {
                OAuthError::Configuration(format!("{prefix}_REDIRECT_URI is not set"))
            })?;
            let enabled = match var("ENABLED") {
                Some(raw) => parse_bool(&raw).ok_or_else(|| {
                    OAuthError::Configuration(format!("{prefix}_ENABLED is not a boolean: {raw}"))
                })?,
                None => true,
            };
            let client = ClientConfig {
                client_id,
                client_secret: var("CLIENT_SECRET").unwrap_or_default(),
                redirect_uri,
                scope: var("SCOPE"),
                enabled,
            };
            config.insert(provider, client);
        }
        Ok(config)
    }
}

fn env_segment(provider: &str) -> String {
    provider
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
