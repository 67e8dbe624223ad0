//! Token state: the four persisted fields and their lifecycle classification.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use strum::{AsRefStr, Display};

use crate::error::OAuthError;
use crate::store::{session_key, SessionStore};

/// Persisted fields, named by their store suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum TokenField {
    AccessToken,
    RefreshToken,
    TokenType,
    ExpiresAt,
    State,
}

/// Lifecycle state derived from token fields at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TokenStatus {
    /// No access token.
    Unauthenticated,
    /// Access token outside the refresh buffer.
    Valid,
    /// Access token inside the refresh buffer, refresh token available.
    Refreshable,
    /// Access token inside the refresh buffer and nothing to refresh with.
    ExpiredUnrefreshable,
}

impl TokenStatus {
    /// Whether an authenticated call may proceed (possibly after a refresh).
    pub fn can_call(self) -> bool {
        matches!(self, Self::Valid | Self::Refreshable)
    }
}

/// A consistent view of the persisted token fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    /// `None` means the token never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSnapshot {
    /// Classify this snapshot at `now`.
    ///
    /// Expiry at exactly `now + buffer` is inside the buffer.
    pub fn classify(&self, now: DateTime<Utc>, buffer: Duration) -> TokenStatus {
        if self.access_token.as_deref().map_or(true, str::is_empty) {
            return TokenStatus::Unauthenticated;
        }
        let Some(expires_at) = self.expires_at else {
            return TokenStatus::Valid;
        };
        if expires_at - now > buffer {
            return TokenStatus::Valid;
        }
        if self.refresh_token.as_deref().is_some_and(|t| !t.is_empty()) {
            TokenStatus::Refreshable
        } else {
            TokenStatus::ExpiredUnrefreshable
        }
    }
}

#[derive(Debug, Default)]
struct Cache {
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    state: Option<String>,
}

/// Two-tier token storage owned by one client.
///
/// Reads hit the in-memory cache first and fall back to the session store.
/// Writes update the cache and go straight through to the store.
pub struct TokenState {
    provider: String,
    store: Option<Arc<dyn SessionStore>>,
    cache: Mutex<Cache>,
}

impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("provider", &self.provider)
            .field("store", &self.store.as_ref().map(|_| ".."))
            .finish()
    }
}

impl TokenState {
    pub fn new(provider: impl Into<String>, store: Option<Arc<dyn SessionStore>>) -> Self {
        Self {
            provider: provider.into(),
            store,
            cache: Mutex::new(Cache::default()),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn access_token(&self) -> Result<Option<String>, OAuthError> {
        self.read_string(TokenField::AccessToken)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, OAuthError> {
        self.read_string(TokenField::RefreshToken)
    }

    pub fn token_type(&self) -> Result<Option<String>, OAuthError> {
        self.read_string(TokenField::TokenType)
    }

    pub fn state(&self) -> Result<Option<String>, OAuthError> {
        self.read_string(TokenField::State)
    }

    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>, OAuthError> {
        if let Some(cached) = self.lock().expires_at {
            return Ok(Some(cached));
        }
        let Some(raw) = self.load(TokenField::ExpiresAt)? else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| OAuthError::Storage(format!("invalid stored expiry {raw:?}: {e}")))?
            .with_timezone(&Utc);
        self.lock().expires_at = Some(parsed);
        Ok(Some(parsed))
    }

    pub fn snapshot(&self) -> Result<TokenSnapshot, OAuthError> {
        Ok(TokenSnapshot {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token()?,
            token_type: self.token_type()?,
            expires_at: self.expires_at()?,
        })
    }

    pub fn set_state(&self, state: Option<&str>) -> Result<(), OAuthError> {
        self.write(TokenField::State, state)?;
        self.lock().state = state.map(str::to_string);
        Ok(())
    }

    /// Persist all four token fields together.
    ///
    /// The store receives one [`SessionStore::set_many`] batch; when it fails
    /// neither the store nor the cache changes.
    pub fn commit(&self, snapshot: &TokenSnapshot) -> Result<(), OAuthError> {
        if let Some(store) = &self.store {
            let entries = [
                (TokenField::AccessToken, snapshot.access_token.clone()),
                (TokenField::RefreshToken, snapshot.refresh_token.clone()),
                (TokenField::TokenType, snapshot.token_type.clone()),
                (TokenField::ExpiresAt, snapshot.expires_at.map(|at| at.to_rfc3339())),
            ]
            .map(|(field, value)| (session_key(&self.provider, field.as_ref()), value));
            store.set_many(&entries)?;
        }

        let mut cache = self.lock();
        cache.access_token = snapshot.access_token.clone();
        cache.refresh_token = snapshot.refresh_token.clone();
        cache.token_type = snapshot.token_type.clone();
        cache.expires_at = snapshot.expires_at;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_string(&self, field: TokenField) -> Result<Option<String>, OAuthError> {
        if let Some(cached) = cache_slot(&mut self.lock(), field).and_then(|slot| slot.clone()) {
            return Ok(Some(cached));
        }
        let loaded = self.load(field)?;
        if let Some(slot) = cache_slot(&mut self.lock(), field) {
            slot.clone_from(&loaded);
        }
        Ok(loaded)
    }

    fn load(&self, field: TokenField) -> Result<Option<String>, OAuthError> {
        match &self.store {
            Some(store) => store.get(&session_key(&self.provider, field.as_ref())),
            None => Ok(None),
        }
    }

    fn write(&self, field: TokenField, value: Option<&str>) -> Result<(), OAuthError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let key = session_key(&self.provider, field.as_ref());
        match value {
            Some(value) => store.set(&key, value),
            None => store.remove(&key),
        }
    }
}

fn cache_slot(cache: &mut Cache, field: TokenField) -> Option<&mut Option<String>> {
    match field {
        TokenField::AccessToken => Some(&mut cache.access_token),
        TokenField::RefreshToken => Some(&mut cache.refresh_token),
        TokenField::TokenType => Some(&mut cache.token_type),
        TokenField::State => Some(&mut cache.state),
        TokenField::ExpiresAt => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySessionStore;
    use pretty_assertions::assert_eq;

    fn buffer() -> Duration {
        Duration::milliseconds(10_000)
    }

    fn snapshot(
        access: Option<&str>,
        refresh: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> TokenSnapshot {
        TokenSnapshot {
            access_token: access.map(String::from),
            refresh_token: refresh.map(String::from),
            token_type: None,
            expires_at,
        }
    }

    #[test]
    fn classify_without_access_token_is_unauthenticated() {
        let now = Utc::now();
        let snap = snapshot(None, Some("r"), Some(now + Duration::hours(1)));
        assert_eq!(snap.classify(now, buffer()), TokenStatus::Unauthenticated);
    }

    #[test]
    fn classify_without_expiry_is_valid_forever() {
        let now = Utc::now();
        let snap = snapshot(Some("a"), None, None);
        assert_eq!(snap.classify(now, buffer()), TokenStatus::Valid);
    }

    #[test]
    fn classify_respects_refresh_buffer_boundary() {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(3600);
        let snap = snapshot(Some("a"), Some("r"), Some(expires_at));

        assert_eq!(snap.classify(now, buffer()), TokenStatus::Valid);
        let just_outside = expires_at - Duration::milliseconds(10_001);
        assert_eq!(snap.classify(just_outside, buffer()), TokenStatus::Valid);
        let at_edge = expires_at - Duration::milliseconds(10_000);
        assert_eq!(snap.classify(at_edge, buffer()), TokenStatus::Refreshable);
        assert_eq!(
            snap.classify(expires_at + Duration::hours(1), buffer()),
            TokenStatus::Refreshable
        );
    }

    #[test]
    fn classify_expired_without_refresh_token() {
        let now = Utc::now();
        let snap = snapshot(Some("a"), None, Some(now - Duration::seconds(1)));
        let status = snap.classify(now, buffer());
        assert_eq!(status, TokenStatus::ExpiredUnrefreshable);
        assert!(!status.can_call());
    }

    #[test]
    fn commit_writes_through_with_namespaced_keys() {
        let store = Arc::new(InMemorySessionStore::new());
        let state = TokenState::new("google", Some(store.clone()));
        let expires_at = Utc::now() + Duration::hours(1);
        let snap = TokenSnapshot {
            access_token: Some("tok".into()),
            refresh_token: Some("ref".into()),
            token_type: Some("Bearer".into()),
            expires_at: Some(expires_at),
        };
        state.commit(&snap).unwrap();

        assert_eq!(
            store.get("google|+|AccessToken").unwrap().as_deref(),
            Some("tok")
        );
        assert_eq!(
            store.get("google|+|RefreshToken").unwrap().as_deref(),
            Some("ref")
        );
        assert_eq!(
            store.get("google|+|ExpiresAt").unwrap(),
            Some(expires_at.to_rfc3339())
        );
    }

    #[test]
    fn reads_fall_back_to_store_for_fresh_instance() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let expires_at = Utc::now() + Duration::hours(1);
        let snap = TokenSnapshot {
            access_token: Some("tok".into()),
            refresh_token: None,
            token_type: Some("Bearer".into()),
            expires_at: Some(expires_at),
        };
        TokenState::new("github", Some(store.clone()))
            .commit(&snap)
            .unwrap();

        let fresh = TokenState::new("github", Some(store));
        let loaded = fresh.snapshot().unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("tok"));
        assert_eq!(loaded.refresh_token, None);
        assert_eq!(
            loaded.expires_at.map(|t| t.timestamp()),
            Some(expires_at.timestamp())
        );
    }

    #[test]
    fn commit_with_absent_refresh_token_removes_stored_value() {
        let store = Arc::new(InMemorySessionStore::new());
        store.set("github|+|RefreshToken", "old").unwrap();
        let state = TokenState::new("github", Some(store.clone()));
        state
            .commit(&snapshot(Some("tok"), None, None))
            .unwrap();
        assert!(store.get("github|+|RefreshToken").unwrap().is_none());
    }

    /// Fails every `set` after the first `allowed`.
    struct FullDisk {
        inner: InMemorySessionStore,
        sets: Mutex<usize>,
        allowed: usize,
    }

    impl SessionStore for FullDisk {
        fn get(&self, key: &str) -> Result<Option<String>, OAuthError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), OAuthError> {
            let mut sets = self.sets.lock().unwrap();
            *sets += 1;
            if *sets == self.allowed + 1 {
                return Err(OAuthError::Storage("disk full".into()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), OAuthError> {
            self.inner.remove(key)
        }

        fn clear(&self) -> Result<(), OAuthError> {
            self.inner.clear()
        }
    }

    #[test]
    fn failed_store_write_leaves_previous_tokens_intact() {
        let now = Utc::now();
        // First commit takes four sets; the second fails on its third (TokenType).
        let store: Arc<dyn SessionStore> = Arc::new(FullDisk {
            inner: InMemorySessionStore::new(),
            sets: Mutex::new(0),
            allowed: 6,
        });
        let state = TokenState::new("google", Some(store.clone()));
        let first = TokenSnapshot {
            access_token: Some("tok1".into()),
            refresh_token: Some("ref1".into()),
            token_type: Some("Bearer".into()),
            expires_at: Some(now + Duration::hours(1)),
        };
        state.commit(&first).unwrap();

        let second = TokenSnapshot {
            access_token: Some("tok2".into()),
            refresh_token: Some("ref2".into()),
            token_type: Some("Bearer".into()),
            expires_at: Some(now + Duration::hours(2)),
        };
        let result = state.commit(&second);
        assert!(matches!(result, Err(OAuthError::Storage(msg)) if msg == "disk full"));

        let persisted = TokenState::new("google", Some(store)).snapshot().unwrap();
        assert_eq!(persisted.access_token.as_deref(), Some("tok1"));
        assert_eq!(persisted.refresh_token.as_deref(), Some("ref1"));
        assert_eq!(
            persisted.expires_at.map(|t| t.timestamp()),
            first.expires_at.map(|t| t.timestamp())
        );
        assert_eq!(state.access_token().unwrap().as_deref(), Some("tok1"));
    }

    #[test]
    fn cache_only_state_works_without_store() {
        let state = TokenState::new("google", None);
        assert!(state.access_token().unwrap().is_none());
        state.commit(&snapshot(Some("tok"), None, None)).unwrap();
        assert_eq!(state.access_token().unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn corrupt_expiry_is_a_storage_error() {
        let store = Arc::new(InMemorySessionStore::new());
        store.set("google|+|ExpiresAt", "tomorrow").unwrap();
        let state = TokenState::new("google", Some(store));
        assert!(matches!(state.expires_at(), Err(OAuthError::Storage(_))));
    }

    #[test]
    fn status_display_is_snake_case() {
        assert_eq!(TokenStatus::ExpiredUnrefreshable.to_string(), "expired_unrefreshable");
    }
}
