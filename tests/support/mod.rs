#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use oauth_relay::client::{ManualClock, OAuthClient};
use oauth_relay::config::ClientConfig;
use oauth_relay::error::OAuthError;
use oauth_relay::provider::{
    AvatarInfo, ProviderAdapter, ProviderEndpoints, TokenPlacement, UserInfo,
};
use oauth_relay::store::{InMemorySessionStore, SessionStore};
use oauth_relay::transport::Endpoint;
use wiremock::MockServer;

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REDIRECT_URI: &str = "https://app.test/auth/callback";

/// Minimal adapter whose endpoints live on a mock server.
pub struct MockProvider {
    name: String,
    endpoints: ProviderEndpoints,
    placement: TokenPlacement,
}

impl MockProvider {
    pub fn new(server: &MockServer) -> Self {
        Self::named("mock", server)
    }

    pub fn named(name: &str, server: &MockServer) -> Self {
        let mut provider = Self::from_base(&server.uri());
        provider.name = name.to_string();
        provider
    }

    pub fn from_base(base_uri: &str) -> Self {
        Self {
            name: "mock".to_string(),
            endpoints: ProviderEndpoints {
                authorize: Endpoint::new(base_uri, "/oauth/authorize"),
                token: Endpoint::new(base_uri, "/oauth/token"),
                user_info: Endpoint::new(base_uri, "/api/me"),
            },
            placement: TokenPlacement::BearerHeader,
        }
    }

    pub fn with_placement(mut self, placement: TokenPlacement) -> Self {
        self.placement = placement;
        self
    }
}

impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    fn token_placement(&self) -> TokenPlacement {
        self.placement
    }

    fn parse_user_info(&self, content: &str) -> Result<UserInfo, OAuthError> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| OAuthError::malformed_profile(self.name(), e.to_string()))?;
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| OAuthError::malformed_profile(self.name(), "missing field id"))?;
        Ok(UserInfo {
            id: id.to_string(),
            first_name: text(&value, "first_name").unwrap_or_default(),
            last_name: text(&value, "last_name").unwrap_or_default(),
            email: text(&value, "email"),
            avatar: AvatarInfo::default(),
            provider_name: String::new(),
        })
    }
}

fn text(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

pub fn client_config() -> ClientConfig {
    ClientConfig::new(CLIENT_ID, CLIENT_SECRET, REDIRECT_URI)
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

pub fn session_store() -> Arc<dyn SessionStore> {
    Arc::new(InMemorySessionStore::new())
}

/// Client against `server` with a fresh in-memory store and a manual clock.
pub fn mock_client(
    server: &MockServer,
    store: Arc<dyn SessionStore>,
    clock: Arc<ManualClock>,
) -> OAuthClient<MockProvider> {
    OAuthClient::new(Arc::new(MockProvider::new(server)), client_config())
        .with_store(store)
        .with_clock(clock)
}
