//! Per-provider application credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OAuthError;

/// Application credentials registered with one provider.
///
/// Read-only to the client; supplied by [`super::OAuthConfig`] or built in code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub redirect_uri: String,
    /// Space-separated scopes; omitted from the login URI when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("enabled", &self.enabled)
            .finish()
    }
}

fn default_enabled() -> bool {
    true
}

impl ClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scope: None,
            enabled: true,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Scope only when it is set and non-blank.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn validate(&self, provider: &str) -> Result<(), OAuthError> {
        if self.client_id.trim().is_empty() {
            return Err(OAuthError::Configuration(format!(
                "client_id for provider {provider} is empty"
            )));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(OAuthError::Configuration(format!(
                "redirect_uri for provider {provider} is empty"
            )));
        }
        url::Url::parse(&self.redirect_uri).map_err(|e| {
            OAuthError::Configuration(format!(
                "redirect_uri for provider {provider} is not a valid URI: {e}"
            ))
        })?;
        Ok(())
    }
}
