use std::collections::BTreeMap;

use crate::error::OAuthError;

/// Query parameters from the provider's redirect back to the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    params: BTreeMap<String, String>,
}

impl CallbackParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a raw query string (with or without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    /// Parse the query part of a full redirect URI.
    pub fn from_redirect_uri(uri: &str) -> Result<Self, OAuthError> {
        let parsed = url::Url::parse(uri)?;
        Ok(Self::from_pairs(parsed.query_pairs().into_owned()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn code(&self) -> Option<&str> {
        self.get("code")
    }

    pub fn state(&self) -> Option<&str> {
        self.get("state")
    }

    pub fn error(&self) -> Option<&str> {
        self.get("error")
    }

    pub fn error_description(&self) -> Option<&str> {
        self.get("error_description")
    }

    /// The provider's error callback as an [`OAuthError::ProviderError`], if any.
    pub fn provider_error(&self) -> Option<OAuthError> {
        self.error().map(|error| OAuthError::ProviderError {
            error: error.to_string(),
            description: self.error_description().map(str::to_string),
        })
    }
}
