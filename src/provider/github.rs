//! GitHub OAuth app adapter.
//!
//! GitHub's token endpoint answers with a urlencoded body unless asked for
//! JSON, and its REST API rejects requests without a `User-Agent`.

use super::user_info::split_name;
use super::{optional_str, parse_profile, required_str, AvatarInfo, ProviderAdapter, ProviderEndpoints, UserInfo};
use crate::config::ClientConfig;
use crate::error::OAuthError;
use crate::transport::{Endpoint, HttpRequest};

const WEB_URL: &str = "https://github.com";
const API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("oauth-relay/", env!("CARGO_PKG_VERSION"));

pub struct GitHub {
    endpoints: ProviderEndpoints,
}

impl GitHub {
    pub fn new() -> Self {
        Self {
            endpoints: ProviderEndpoints {
                authorize: Endpoint::new(WEB_URL, "/login/oauth/authorize"),
                token: Endpoint::new(WEB_URL, "/login/oauth/access_token"),
                user_info: Endpoint::new(API_URL, "/user"),
            },
        }
    }

    pub fn with_endpoints(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }
}

impl Default for GitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for GitHub {
    fn name(&self) -> &str {
        "github"
    }

    fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    fn before_user_info(
        &self,
        request: &mut HttpRequest,
        _config: &ClientConfig,
    ) -> Result<(), OAuthError> {
        request
            .add_header("User-Agent", USER_AGENT)
            .add_header("X-GitHub-Api-Version", "2022-11-28");
        Ok(())
    }

    fn parse_user_info(&self, content: &str) -> Result<UserInfo, OAuthError> {
        let value = parse_profile(self.name(), content)?;
        let id = required_str(self.name(), &value, "id")?;
        // `name` is null for accounts that never set one.
        let display = optional_str(&value, "name")
            .or_else(|| optional_str(&value, "login"))
            .unwrap_or_default();
        let (first_name, last_name) = split_name(&display);
        let avatar = optional_str(&value, "avatar_url");

        Ok(UserInfo {
            id,
            first_name,
            last_name,
            email: optional_str(&value, "email"),
            avatar: AvatarInfo {
                small: avatar.as_ref().map(|url| sized_avatar(url, 40)),
                normal: avatar.clone(),
                large: avatar.as_ref().map(|url| sized_avatar(url, 460)),
            },
            provider_name: String::new(),
        })
    }
}

fn sized_avatar(url: &str, size: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}s={size}")
}
