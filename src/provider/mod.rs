//! Provider adapters: per-provider endpoints, profile parsing and request hooks.
//!
//! An adapter is configuration data plus a parser. The lifecycle logic lives
//! in [`crate::client::OAuthClient`]; adapters only get to mutate requests
//! and inspect responses at four well-defined points.

pub mod callback;
pub mod user_info;

#[cfg(feature = "facebook")]
pub mod facebook;
#[cfg(feature = "github")]
pub mod github;
#[cfg(feature = "google")]
pub mod google;
#[cfg(feature = "yandex")]
pub mod yandex;

pub use callback::CallbackParams;
pub use user_info::{AvatarInfo, UserInfo};

use crate::config::ClientConfig;
use crate::error::OAuthError;
use crate::transport::{Endpoint, HttpRequest, HttpResponse};

/// Where the access token goes on authenticated API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPlacement {
    /// `Authorization: Bearer <token>`.
    #[default]
    BearerHeader,
    /// `Authorization: <scheme> <token>`.
    AuthorizationHeader(&'static str),
    /// `?<name>=<token>`, usually `access_token`.
    QueryParameter(&'static str),
}

/// The three endpoints every provider exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorize: Endpoint,
    pub token: Endpoint,
    pub user_info: Endpoint,
}

impl ProviderEndpoints {
    /// Point all three endpoints at one base URI, keeping resource paths.
    pub fn rebased(&self, base_uri: &str) -> Self {
        Self {
            authorize: self.authorize.rebased(base_uri),
            token: self.token.rebased(base_uri),
            user_info: self.user_info.rebased(base_uri),
        }
    }
}

/// Capability set the lifecycle engine needs from a provider.
///
/// Hooks default to the plain RFC 6749 behavior. Overrides usually call the
/// matching free function in this module and then adjust the request.
/// Hooks never decide lifecycle state.
pub trait ProviderAdapter: Send + Sync {
    /// Stable, non-empty name; also the session-store namespace.
    fn name(&self) -> &str;

    fn endpoints(&self) -> &ProviderEndpoints;

    /// Normalize a raw profile payload.
    ///
    /// Fails with [`OAuthError::MalformedProfile`] when required fields are missing.
    fn parse_user_info(&self, content: &str) -> Result<UserInfo, OAuthError>;

    fn token_placement(&self) -> TokenPlacement {
        TokenPlacement::default()
    }

    fn before_token_exchange(
        &self,
        request: &mut HttpRequest,
        config: &ClientConfig,
        callback: &CallbackParams,
    ) -> Result<(), OAuthError> {
        add_code_exchange_params(request, config, callback)
    }

    fn before_refresh(
        &self,
        request: &mut HttpRequest,
        config: &ClientConfig,
        refresh_token: &str,
    ) -> Result<(), OAuthError> {
        add_refresh_params(request, config, refresh_token);
        Ok(())
    }

    fn after_token_exchange(&self, _response: &HttpResponse) -> Result<(), OAuthError> {
        Ok(())
    }

    fn before_user_info(
        &self,
        _request: &mut HttpRequest,
        _config: &ClientConfig,
    ) -> Result<(), OAuthError> {
        Ok(())
    }
}

/// Standard `authorization_code` grant parameters.
///
/// Fails with [`OAuthError::UnexpectedResponse`] when the callback has no `code`.
pub fn add_code_exchange_params(
    request: &mut HttpRequest,
    config: &ClientConfig,
    callback: &CallbackParams,
) -> Result<(), OAuthError> {
    let code = callback.code().ok_or_else(|| {
        OAuthError::UnexpectedResponse("callback parameters did not contain code".to_string())
    })?;
    request
        .add_form("code", code)
        .add_form("client_id", &config.client_id)
        .add_form("client_secret", &config.client_secret)
        .add_form("redirect_uri", &config.redirect_uri)
        .add_form("grant_type", "authorization_code");
    Ok(())
}

/// Standard `refresh_token` grant parameters.
pub fn add_refresh_params(request: &mut HttpRequest, config: &ClientConfig, refresh_token: &str) {
    request
        .add_form("refresh_token", refresh_token)
        .add_form("client_id", &config.client_id)
        .add_form("client_secret", &config.client_secret)
        .add_form("grant_type", "refresh_token");
}

/// Move client credentials from the form body to HTTP basic auth
/// (`client_secret_basic`).
pub fn use_basic_client_auth(request: &mut HttpRequest, config: &ClientConfig) {
    request
        .remove_form("client_id")
        .remove_form("client_secret")
        .set_basic_auth(&config.client_id, &config.client_secret);
}

/// Pull a required string field out of a profile payload.
pub(crate) fn required_str(
    provider: &str,
    value: &serde_json::Value,
    key: &str,
) -> Result<String, OAuthError> {
    match value.get(key) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(OAuthError::malformed_profile(
            provider,
            format!("missing field {key}"),
        )),
    }
}

pub(crate) fn optional_str(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn parse_profile(provider: &str, content: &str) -> Result<serde_json::Value, OAuthError> {
    serde_json::from_str(content)
        .map_err(|e| OAuthError::malformed_profile(provider, format!("invalid JSON: {e}")))
}
