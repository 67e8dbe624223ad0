//! Yandex ID adapter.
//!
//! Yandex authenticates the client with HTTP basic auth on the token
//! endpoint and expects the `OAuth` authorization scheme on API calls.

use super::{
    add_code_exchange_params, add_refresh_params, optional_str, parse_profile, required_str,
    use_basic_client_auth, AvatarInfo, CallbackParams, ProviderAdapter, ProviderEndpoints,
    TokenPlacement, UserInfo,
};
use crate::config::ClientConfig;
use crate::error::OAuthError;
use crate::transport::{Endpoint, HttpRequest};

const OAUTH_URL: &str = "https://oauth.yandex.ru";
const LOGIN_URL: &str = "https://login.yandex.ru";
const AVATAR_URL: &str = "https://avatars.yandex.net/get-yapic";

pub struct Yandex {
    endpoints: ProviderEndpoints,
}

impl Yandex {
    pub fn new() -> Self {
        Self {
            endpoints: ProviderEndpoints {
                authorize: Endpoint::new(OAUTH_URL, "/authorize"),
                token: Endpoint::new(OAUTH_URL, "/token"),
                user_info: Endpoint::new(LOGIN_URL, "/info"),
            },
        }
    }

    pub fn with_endpoints(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }
}

impl Default for Yandex {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for Yandex {
    fn name(&self) -> &str {
        "yandex"
    }

    fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    fn token_placement(&self) -> TokenPlacement {
        TokenPlacement::AuthorizationHeader("OAuth")
    }

    fn before_token_exchange(
        &self,
        request: &mut HttpRequest,
        config: &ClientConfig,
        callback: &CallbackParams,
    ) -> Result<(), OAuthError> {
        add_code_exchange_params(request, config, callback)?;
        use_basic_client_auth(request, config);
        Ok(())
    }

    fn before_refresh(
        &self,
        request: &mut HttpRequest,
        config: &ClientConfig,
        refresh_token: &str,
    ) -> Result<(), OAuthError> {
        add_refresh_params(request, config, refresh_token);
        use_basic_client_auth(request, config);
        Ok(())
    }

    fn before_user_info(
        &self,
        request: &mut HttpRequest,
        _config: &ClientConfig,
    ) -> Result<(), OAuthError> {
        request.add_query("format", "json");
        Ok(())
    }

    fn parse_user_info(&self, content: &str) -> Result<UserInfo, OAuthError> {
        let value = parse_profile(self.name(), content)?;
        let id = required_str(self.name(), &value, "id")?;
        let avatar = match optional_str(&value, "default_avatar_id") {
            Some(avatar_id) if value.get("is_avatar_empty") != Some(&serde_json::Value::Bool(true)) => {
                let picture = |size: &str| format!("{AVATAR_URL}/{avatar_id}/{size}");
                AvatarInfo {
                    small: Some(picture("islands-small")),
                    normal: Some(picture("islands-middle")),
                    large: Some(picture("islands-200")),
                }
            }
            _ => AvatarInfo::default(),
        };

        Ok(UserInfo {
            id,
            first_name: optional_str(&value, "first_name").unwrap_or_default(),
            last_name: optional_str(&value, "last_name").unwrap_or_default(),
            email: optional_str(&value, "default_email"),
            avatar,
            provider_name: String::new(),
        })
    }
}
