//! Facebook Login adapter.

use super::{optional_str, parse_profile, required_str, AvatarInfo, ProviderAdapter, ProviderEndpoints, UserInfo};
use crate::config::ClientConfig;
use crate::error::OAuthError;
use crate::transport::{Endpoint, HttpRequest};

const WEB_URL: &str = "https://www.facebook.com";
const GRAPH_URL: &str = "https://graph.facebook.com";
const PROFILE_FIELDS: &str = "id,first_name,last_name,email";

pub struct Facebook {
    endpoints: ProviderEndpoints,
}

impl Facebook {
    pub fn new() -> Self {
        Self {
            endpoints: ProviderEndpoints {
                authorize: Endpoint::new(WEB_URL, "/dialog/oauth"),
                token: Endpoint::new(GRAPH_URL, "/oauth/access_token"),
                user_info: Endpoint::new(GRAPH_URL, "/me"),
            },
        }
    }

    pub fn with_endpoints(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }
}

impl Default for Facebook {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for Facebook {
    fn name(&self) -> &str {
        "facebook"
    }

    fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// The Graph API returns only `id` and `name` unless fields are requested.
    fn before_user_info(
        &self,
        request: &mut HttpRequest,
        _config: &ClientConfig,
    ) -> Result<(), OAuthError> {
        request.add_query("fields", PROFILE_FIELDS);
        Ok(())
    }

    fn parse_user_info(&self, content: &str) -> Result<UserInfo, OAuthError> {
        let value = parse_profile(self.name(), content)?;
        let id = required_str(self.name(), &value, "id")?;
        let picture = |size: &str| format!("{GRAPH_URL}/{id}/picture?type={size}");
        let avatar = AvatarInfo {
            small: Some(picture("small")),
            normal: Some(picture("normal")),
            large: Some(picture("large")),
        };

        Ok(UserInfo {
            first_name: optional_str(&value, "first_name").unwrap_or_default(),
            last_name: optional_str(&value, "last_name").unwrap_or_default(),
            email: optional_str(&value, "email"),
            avatar,
            id,
            provider_name: String::new(),
        })
    }
}
