//! Token lifecycle engine.
//!
//! [`OAuthClient`] binds one provider adapter to application credentials,
//! a transport and a session store. It builds login URIs, exchanges codes,
//! refreshes tokens that are about to expire and gates authenticated calls.
//! Lifecycle state is never stored; it is derived from the token fields on
//! every decision.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::sync::Arc;

use chrono::Duration;
use url::Url;

use crate::config::{ClientConfig, DEFAULT_REFRESH_BUFFER_MS};
use crate::error::OAuthError;
use crate::provider::{CallbackParams, ProviderAdapter, TokenPlacement, UserInfo};
use crate::response::{parse_field, token_snapshot, REFRESH_TOKEN_KEY};
use crate::store::SessionStore;
use crate::token::{TokenState, TokenStatus};
use crate::transport::{Endpoint, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Fresh opaque value for the login URI's `state` parameter.
///
/// Keep it in the user's session and compare it with
/// [`OAuthClient::state`] after the redirect.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Caller-supplied request mutation applied before an authenticated call.
pub type RequestHook<'a> = &'a (dyn Fn(&mut HttpRequest) -> Result<(), OAuthError> + Send + Sync);

/// Caller-supplied response inspection applied after an authenticated call.
pub type ResponseHook<'a> = &'a (dyn Fn(&HttpResponse) -> Result<(), OAuthError> + Send + Sync);

/// OAuth2 authorization-code client for a single provider.
///
/// One instance serves one login/refresh/call sequence. Instances built per
/// request stay consistent as long as they share a session store and
/// provider name. Two instances refreshing the same key concurrently may
/// both hit the token endpoint; the store is expected to be scoped tightly
/// enough (one user's session) that this does not happen in practice.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use oauth_relay::client::OAuthClient;
/// use oauth_relay::config::ClientConfig;
/// use oauth_relay::provider::{github::GitHub, CallbackParams};
/// use oauth_relay::store::InMemorySessionStore;
///
/// # async fn example() -> oauth_relay::error::Result<()> {
/// let config = ClientConfig::new("client-id", "client-secret", "https://app.example/auth/github");
/// let client = OAuthClient::new(Arc::new(GitHub::new()), config)
///     .with_store(Arc::new(InMemorySessionStore::new()));
///
/// let redirect_to = client.login_uri(Some("csrf-token"))?;
/// // ... user comes back to the redirect URI ...
/// let callback = CallbackParams::from_query("code=abc123&state=csrf-token");
/// let user = client.user_info(Some(&callback)).await?;
/// println!("{} via {}: {}", user.id, user.provider_name, redirect_to);
/// # Ok(())
/// # }
/// ```
pub struct OAuthClient<A: ?Sized = dyn ProviderAdapter> {
    adapter: Arc<A>,
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenState,
    clock: Arc<dyn Clock>,
    refresh_buffer: Duration,
}

impl<A: ProviderAdapter + ?Sized> std::fmt::Debug for OAuthClient<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("provider", &self.adapter.name())
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish()
    }
}

impl<A: ProviderAdapter + ?Sized> OAuthClient<A> {
    /// Client with the shared reqwest transport, no persistence and the system clock.
    pub fn new(adapter: Arc<A>, config: ClientConfig) -> Self {
        let tokens = TokenState::new(adapter.name(), None);
        Self {
            adapter,
            config,
            transport: Arc::new(ReqwestTransport::default()),
            tokens,
            clock: Arc::new(SystemClock),
            refresh_buffer: Duration::milliseconds(DEFAULT_REFRESH_BUFFER_MS as i64),
        }
    }

    /// Persist token state in `store`, namespaced by the provider name.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.tokens = TokenState::new(self.adapter.name(), Some(store));
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Refresh tokens once they are this close to expiry.
    ///
    /// A buffer too large for [`chrono::Duration`] saturates, so every token
    /// with an expiry counts as due for refresh.
    pub fn with_refresh_buffer(mut self, buffer: std::time::Duration) -> Self {
        self.refresh_buffer = Duration::from_std(buffer).unwrap_or(Duration::MAX);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.adapter.name()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenState {
        &self.tokens
    }

    pub fn access_token(&self) -> Result<Option<String>, OAuthError> {
        self.tokens.access_token()
    }

    pub fn refresh_token(&self) -> Result<Option<String>, OAuthError> {
        self.tokens.refresh_token()
    }

    pub fn token_type(&self) -> Result<Option<String>, OAuthError> {
        self.tokens.token_type()
    }

    /// `None` when the provider did not report an expiry and no default applied.
    pub fn expires_at(&self) -> Result<Option<chrono::DateTime<chrono::Utc>>, OAuthError> {
        self.tokens.expires_at()
    }

    /// `state` from the most recent callback.
    pub fn state(&self) -> Result<Option<String>, OAuthError> {
        self.tokens.state()
    }

    /// Current lifecycle state, computed from the stored token fields.
    pub fn status(&self) -> Result<TokenStatus, OAuthError> {
        Ok(self
            .tokens
            .snapshot()?
            .classify(self.clock.now(), self.refresh_buffer))
    }

    /// Authorization URI to redirect the user to. No network access.
    pub fn login_uri(&self, state: Option<&str>) -> Result<Url, OAuthError> {
        let mut request = HttpRequest::get(self.adapter.endpoints().authorize.clone());
        request
            .add_query("response_type", "code")
            .add_query("client_id", &self.config.client_id)
            .add_query("redirect_uri", &self.config.redirect_uri);
        if let Some(state) = state.filter(|s| !s.is_empty()) {
            request.add_query("state", state);
        }
        if let Some(scope) = self.config.scope() {
            request.add_query("scope", scope);
        }
        let uri = request.build_uri()?;
        tracing::debug!(provider = %self.provider_name(), "built login uri");
        Ok(uri)
    }

    /// Handle the provider's redirect: exchange the code and store the tokens.
    ///
    /// Returns the new access token. An `error` callback fails before any
    /// network access or state change.
    pub async fn complete_login(&self, callback: &CallbackParams) -> Result<String, OAuthError> {
        if let Some(error) = callback.provider_error() {
            tracing::debug!(provider = %self.provider_name(), error = %error, "provider returned error callback");
            return Err(error);
        }
        self.tokens.set_state(callback.state())?;

        let mut request = HttpRequest::post(self.adapter.endpoints().token.clone());
        self.adapter
            .before_token_exchange(&mut request, &self.config, callback)?;

        tracing::debug!(provider = %self.provider_name(), "exchanging authorization code");
        let response = self.transport.execute_and_verify(request).await?;
        self.adapter.after_token_exchange(&response)?;

        let refresh_token = parse_field(&response.body, REFRESH_TOKEN_KEY);
        self.store_exchange(&response.body, refresh_token)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// [`call`](Self::call) does this automatically; calling it directly is
    /// only needed to force a refresh.
    pub async fn refresh(&self) -> Result<String, OAuthError> {
        let current = self
            .tokens
            .refresh_token()?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| self.login_required())?;

        let mut request = HttpRequest::post(self.adapter.endpoints().token.clone());
        self.adapter
            .before_refresh(&mut request, &self.config, &current)?;

        tracing::debug!(provider = %self.provider_name(), "refreshing access token");
        let response = self.transport.execute_and_verify(request).await?;
        self.adapter.after_token_exchange(&response)?;

        // Providers that do not rotate refresh tokens omit the field.
        let refresh_token = parse_field(&response.body, REFRESH_TOKEN_KEY).or(Some(current));
        self.store_exchange(&response.body, refresh_token)
    }

    /// GET an authenticated provider endpoint and return the response body.
    ///
    /// Fails with [`OAuthError::LoginRequired`] without touching the network
    /// when there is no usable token; refreshes first when the token is
    /// inside the refresh buffer.
    pub async fn call(
        &self,
        endpoint: &Endpoint,
        before: Option<RequestHook<'_>>,
        after: Option<ResponseHook<'_>>,
    ) -> Result<String, OAuthError> {
        self.call_request(HttpRequest::get(endpoint.clone()), before, after)
            .await
    }

    /// Like [`call`](Self::call) for an arbitrary prepared request.
    pub async fn call_request(
        &self,
        mut request: HttpRequest,
        before: Option<RequestHook<'_>>,
        after: Option<ResponseHook<'_>>,
    ) -> Result<String, OAuthError> {
        let access_token = self.ensure_access_token().await?;
        match self.adapter.token_placement() {
            TokenPlacement::BearerHeader => {
                request.add_header("Authorization", format!("Bearer {access_token}"));
            }
            TokenPlacement::AuthorizationHeader(scheme) => {
                request.add_header("Authorization", format!("{scheme} {access_token}"));
            }
            TokenPlacement::QueryParameter(name) => {
                request.add_query(name, access_token);
            }
        }
        if let Some(before) = before {
            before(&mut request)?;
        }

        tracing::debug!(
            provider = %self.provider_name(),
            method = %request.method,
            endpoint = %request.endpoint,
            "calling provider api"
        );
        let response = self.transport.execute_and_verify(request).await?;
        if let Some(after) = after {
            after(&response)?;
        }
        Ok(response.body)
    }

    /// Fetch and normalize the user's profile, completing the login first
    /// when callback parameters are given.
    pub async fn user_info(
        &self,
        callback: Option<&CallbackParams>,
    ) -> Result<UserInfo, OAuthError> {
        if let Some(callback) = callback {
            self.complete_login(callback).await?;
        }
        let before = |request: &mut HttpRequest| self.adapter.before_user_info(request, &self.config);
        let content = self
            .call(&self.adapter.endpoints().user_info, Some(&before), None)
            .await?;
        let mut info = self.adapter.parse_user_info(&content)?;
        info.provider_name = self.provider_name().to_string();
        Ok(info)
    }

    async fn ensure_access_token(&self) -> Result<String, OAuthError> {
        let status = self.status()?;
        tracing::debug!(provider = %self.provider_name(), %status, "token status before call");
        match status {
            TokenStatus::Unauthenticated | TokenStatus::ExpiredUnrefreshable => {
                Err(self.login_required())
            }
            TokenStatus::Refreshable => self.refresh().await,
            TokenStatus::Valid => self
                .tokens
                .access_token()?
                .ok_or_else(|| self.login_required()),
        }
    }

    fn store_exchange(
        &self,
        body: &str,
        refresh_token: Option<String>,
    ) -> Result<String, OAuthError> {
        let snapshot = token_snapshot(body, refresh_token, self.clock.now())?;
        self.tokens.commit(&snapshot)?;
        tracing::debug!(
            provider = %self.provider_name(),
            has_refresh_token = snapshot.refresh_token.is_some(),
            expires_at = ?snapshot.expires_at,
            "stored tokens"
        );
        snapshot
            .access_token
            .ok_or_else(|| OAuthError::UnexpectedResponse("access_token missing".to_string()))
    }

    fn login_required(&self) -> OAuthError {
        OAuthError::LoginRequired {
            provider: self.provider_name().to_string(),
        }
    }
}
