//! Provider registration and client construction from configuration.
//!
//! [`ProviderRegistry`] is an explicit table from provider key to adapter
//! factory. [`ClientRegistry`] walks the enabled entries of an
//! [`OAuthConfig`] and pairs each with an adapter from that table.

pub mod factories;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use crate::client::{Clock, OAuthClient};
use crate::config::{ClientConfig, OAuthConfig};
use crate::error::OAuthError;
use crate::provider::ProviderAdapter;
use crate::store::SessionStore;
use crate::transport::HttpTransport;

/// Builds the adapter for an OAuth provider named in configuration.
pub trait AdapterFactory: Send + Sync {
    /// Configuration keys (`[clients.<key>]`) this factory answers for.
    fn provider_keys(&self) -> &[&str];

    /// Adapter for `provider_key`, one of [`Self::provider_keys`].
    fn create(&self, provider_key: &str) -> Result<Arc<dyn ProviderAdapter>, OAuthError>;
}

/// Table from configuration key to the factory that knows that provider's
/// endpoints and profile format.
pub struct ProviderRegistry {
    factories: HashMap<String, Arc<dyn AdapterFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every built-in adapter enabled at compile time.
    pub fn builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "google")]
        registry.register(Arc::new(factories::GoogleFactory));
        #[cfg(feature = "github")]
        registry.register(Arc::new(factories::GitHubFactory));
        #[cfg(feature = "facebook")]
        registry.register(Arc::new(factories::FacebookFactory));
        #[cfg(feature = "yandex")]
        registry.register(Arc::new(factories::YandexFactory));
        registry
    }

    /// Process-wide registry of the built-in adapters, populated on first use.
    pub fn global() -> &'static ProviderRegistry {
        GLOBAL_REGISTRY.get_or_init(Self::builtin)
    }

    /// Make every key the factory declares available to [`ClientRegistry::from_config`].
    ///
    /// Registering a key again swaps in the new factory, which is how callers
    /// replace a built-in adapter (for instance to point it at a test server).
    pub fn register(&mut self, factory: Arc<dyn AdapterFactory>) {
        for key in factory.provider_keys() {
            self.factories.insert(key.to_string(), factory.clone());
        }
    }

    /// Adapter for a configured client, or a configuration error naming the key.
    pub fn create_adapter(&self, provider_key: &str) -> Result<Arc<dyn ProviderAdapter>, OAuthError> {
        self.factories
            .get(provider_key)
            .ok_or_else(|| {
                OAuthError::Configuration(format!(
                    "No adapter factory registered for '{provider_key}'"
                ))
            })?
            .create(provider_key)
    }

    /// Whether a `[clients.<key>]` entry with this key can be enabled.
    pub fn has_provider(&self, provider_key: &str) -> bool {
        self.factories.contains_key(provider_key)
    }

    /// Keys that can appear in configuration, sorted.
    pub fn provider_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: OnceLock<ProviderRegistry> = OnceLock::new();

struct Entry {
    adapter: Arc<dyn ProviderAdapter>,
    config: ClientConfig,
}

/// Ready-to-use adapters for every enabled configuration entry.
///
/// Clients are built on demand so each can be bound to the caller's
/// session store.
pub struct ClientRegistry {
    entries: BTreeMap<String, Entry>,
    refresh_buffer: std::time::Duration,
    transport: Option<Arc<dyn HttpTransport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ClientRegistry {
    /// Validate and resolve every enabled entry in `config`.
    ///
    /// Disabled entries are skipped entirely. An enabled entry with no
    /// registered factory or invalid credentials fails the whole build.
    pub fn from_config(providers: &ProviderRegistry, config: &OAuthConfig) -> Result<Self, OAuthError> {
        let mut entries = BTreeMap::new();
        for (key, client) in config.enabled_clients() {
            client.validate(key)?;
            let adapter = providers.create_adapter(key)?;
            tracing::debug!(provider = key, adapter = adapter.name(), "registered oauth client");
            entries.insert(
                key.to_string(),
                Entry {
                    adapter,
                    config: client.clone(),
                },
            );
        }
        Ok(Self {
            entries,
            refresh_buffer: config.settings.refresh_buffer(),
            transport: None,
            clock: None,
        })
    }

    /// Transport shared by every client built from this registry.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enabled provider keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, provider_key: &str) -> bool {
        self.entries.contains_key(provider_key)
    }

    pub fn adapter(&self, provider_key: &str) -> Option<&Arc<dyn ProviderAdapter>> {
        self.entries.get(provider_key).map(|entry| &entry.adapter)
    }

    /// Build a client for `provider_key`, persisting tokens in `store` when given.
    pub fn client(
        &self,
        provider_key: &str,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Result<OAuthClient, OAuthError> {
        let entry = self.entries.get(provider_key).ok_or_else(|| {
            OAuthError::Configuration(format!("No enabled client for '{provider_key}'"))
        })?;
        let mut client = OAuthClient::new(entry.adapter.clone(), entry.config.clone())
            .with_refresh_buffer(self.refresh_buffer);
        if let Some(store) = store {
            client = client.with_store(store);
        }
        if let Some(transport) = &self.transport {
            client = client.with_transport(transport.clone());
        }
        if let Some(clock) = &self.clock {
            client = client.with_clock(clock.clone());
        }
        Ok(client)
    }

    /// One client per enabled entry, all sharing `store`.
    pub fn clients(
        &self,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Result<Vec<OAuthClient>, OAuthError> {
        self.keys()
            .map(|key| self.client(key, store.clone()))
            .collect()
    }
}
