//! Google sign-in adapter.

use serde::Deserialize;

use super::{parse_profile, AvatarInfo, ProviderAdapter, ProviderEndpoints, UserInfo};
use crate::error::OAuthError;
use crate::transport::Endpoint;

const ACCOUNTS_URL: &str = "https://accounts.google.com";
const TOKEN_URL: &str = "https://oauth2.googleapis.com";
const API_URL: &str = "https://www.googleapis.com";

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    id: String,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

pub struct Google {
    endpoints: ProviderEndpoints,
}

impl Google {
    pub fn new() -> Self {
        Self {
            endpoints: ProviderEndpoints {
                authorize: Endpoint::new(ACCOUNTS_URL, "/o/oauth2/auth"),
                token: Endpoint::new(TOKEN_URL, "/token"),
                user_info: Endpoint::new(API_URL, "/oauth2/v2/userinfo"),
            },
        }
    }

    pub fn with_endpoints(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }
}

impl Default for Google {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for Google {
    fn name(&self) -> &str {
        "google"
    }

    fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    fn parse_user_info(&self, content: &str) -> Result<UserInfo, OAuthError> {
        let value = parse_profile(self.name(), content)?;
        let profile: GoogleProfile = serde_json::from_value(value)
            .map_err(|e| OAuthError::malformed_profile(self.name(), e.to_string()))?;
        if profile.id.is_empty() {
            return Err(OAuthError::malformed_profile(self.name(), "missing field id"));
        }
        Ok(UserInfo {
            id: profile.id,
            first_name: profile.given_name.unwrap_or_default(),
            last_name: profile.family_name.unwrap_or_default(),
            email: profile.email.filter(|e| !e.is_empty()),
            avatar: AvatarInfo {
                small: None,
                normal: profile.picture,
                large: None,
            },
            provider_name: String::new(),
        })
    }
}
