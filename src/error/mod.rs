//! Error types for oauth-relay.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all client operations.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// The provider redirected back with a non-empty `error` parameter.
    #[error("Provider returned error: {error}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    ProviderError {
        error: String,
        description: Option<String>,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Non-success HTTP status or network-level failure.
    #[error("Transport failure{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport { status: Option<u16>, message: String },

    #[error("Login required for provider {provider}")]
    LoginRequired { provider: String },

    #[error("Malformed {provider} profile: {message}")]
    MalformedProfile { provider: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OAuthError {
    /// Transport failure for a non-success status, keeping the body for diagnostics.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: body.into(),
        }
    }

    pub fn malformed_profile(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedProfile {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderError { .. } => ErrorCategory::Provider,
            Self::LoginRequired { .. } => ErrorCategory::Authentication,
            Self::UnexpectedResponse(_) | Self::MalformedProfile { .. } => ErrorCategory::Protocol,
            Self::Transport { status, .. } => match status {
                None => ErrorCategory::Network,
                Some(401 | 403) => ErrorCategory::Authentication,
                Some(429) => ErrorCategory::RateLimit,
                Some(500..=599) => ErrorCategory::Server,
                Some(_) => ErrorCategory::Protocol,
            },
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Serialization(_) => ErrorCategory::Serialization,
        }
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// The client itself never retries; this is advice for the transport layer
    /// or the application.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Provider | ErrorCategory::Authentication => {
                RecoverySuggestion::RestartLogin
            }
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server => {
                RecoverySuggestion::RetryWithBackoff
            }
            ErrorCategory::Protocol => match self {
                Self::MalformedProfile { .. } => RecoverySuggestion::CheckProviderAdapter,
                _ => RecoverySuggestion::CheckCredentials,
            },
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Storage | ErrorCategory::Serialization => {
                RecoverySuggestion::CheckStorage
            }
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}

impl From<url::ParseError> for OAuthError {
    fn from(error: url::ParseError) -> Self {
        Self::Configuration(format!("invalid URI: {error}"))
    }
}

impl From<std::io::Error> for OAuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for OAuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for OAuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, OAuthError>;
