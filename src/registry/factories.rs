//! AdapterFactory implementations for each built-in provider.

use std::sync::Arc;

use super::AdapterFactory;
use crate::error::OAuthError;
use crate::provider::ProviderAdapter;

// ---------------------------------------------------------------------------
// Google
// ---------------------------------------------------------------------------

#[cfg(feature = "google")]
pub struct GoogleFactory;

#[cfg(feature = "google")]
impl AdapterFactory for GoogleFactory {
    fn provider_keys(&self) -> &[&str] {
        &["google"]
    }

    fn create(&self, _provider_key: &str) -> Result<Arc<dyn ProviderAdapter>, OAuthError> {
        Ok(Arc::new(crate::provider::google::Google::new()))
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[cfg(feature = "github")]
pub struct GitHubFactory;

#[cfg(feature = "github")]
impl AdapterFactory for GitHubFactory {
    fn provider_keys(&self) -> &[&str] {
        &["github"]
    }

    fn create(&self, _provider_key: &str) -> Result<Arc<dyn ProviderAdapter>, OAuthError> {
        Ok(Arc::new(crate::provider::github::GitHub::new()))
    }
}

// ---------------------------------------------------------------------------
// Facebook
// ---------------------------------------------------------------------------

#[cfg(feature = "facebook")]
pub struct FacebookFactory;

#[cfg(feature = "facebook")]
impl AdapterFactory for FacebookFactory {
    fn provider_keys(&self) -> &[&str] {
        &["facebook"]
    }

    fn create(&self, _provider_key: &str) -> Result<Arc<dyn ProviderAdapter>, OAuthError> {
        Ok(Arc::new(crate::provider::facebook::Facebook::new()))
    }
}

// ---------------------------------------------------------------------------
// Yandex
// ---------------------------------------------------------------------------

#[cfg(feature = "yandex")]
pub struct YandexFactory;

#[cfg(feature = "yandex")]
impl AdapterFactory for YandexFactory {
    fn provider_keys(&self) -> &[&str] {
        &["yandex"]
    }

    fn create(&self, _provider_key: &str) -> Result<Arc<dyn ProviderAdapter>, OAuthError> {
        Ok(Arc::new(crate::provider::yandex::Yandex::new()))
    }
}
