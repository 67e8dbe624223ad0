//! Key/value persistence for token state.
//!
//! The client only needs string keys. Keys are namespaced per provider with
//! [`session_key`] so several providers can share one store.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OAuthError;

const KEY_SEPARATOR: &str = "|+|";
const SESSION_FILE_VERSION: u32 = 1;

/// Build the namespaced store key for a provider field.
///
/// ```
/// assert_eq!(oauth_relay::store::session_key("google", "AccessToken"), "google|+|AccessToken");
/// ```
pub fn session_key(provider: &str, field: &str) -> String {
    format!("{provider}{KEY_SEPARATOR}{field}")
}

/// Storage abstraction behind the token state cache.
///
/// Implementations must be safe for the concurrency model they are used in;
/// a per-user session store needs no further locking.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, OAuthError>;
    fn set(&self, key: &str, value: &str) -> Result<(), OAuthError>;
    fn remove(&self, key: &str) -> Result<(), OAuthError>;
    fn clear(&self) -> Result<(), OAuthError>;

    fn contains(&self, key: &str) -> Result<bool, OAuthError> {
        Ok(self.get(key)?.is_some())
    }

    /// Apply several writes as one unit. A `None` value removes the key.
    ///
    /// The provided implementation writes entries in order and puts back the
    /// previous values of the keys it already touched when a later write
    /// fails. Stores that can replace everything at once should override it.
    fn set_many(&self, entries: &[(String, Option<String>)]) -> Result<(), OAuthError> {
        let mut applied: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let step = self.get(key).and_then(|previous| {
                apply_entry(self, key, value.as_deref())?;
                Ok(previous)
            });
            match step {
                Ok(previous) => applied.push((key.as_str(), previous)),
                Err(err) => {
                    for (key, previous) in applied.into_iter().rev() {
                        if let Err(restore_err) = apply_entry(self, key, previous.as_deref()) {
                            tracing::warn!(key, error = %restore_err, "failed to restore session value");
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

fn apply_entry<S: SessionStore + ?Sized>(
    store: &S,
    key: &str,
    value: Option<&str>,
) -> Result<(), OAuthError> {
    match value {
        Some(value) => store.set(key, value),
        None => store.remove(key),
    }
}

/// Process-local store, typically one per user session.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, OAuthError> {
        let values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), OAuthError> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), OAuthError> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), OAuthError> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        Ok(())
    }

    fn set_many(&self, entries: &[(String, Option<String>)]) -> Result<(), OAuthError> {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (key, value) in entries {
            match value {
                Some(value) => values.insert(key.clone(), value.clone()),
                None => values.remove(key),
            };
        }
        Ok(())
    }
}

/// File-backed session store using a single TOML file per scope.
///
/// Every write replaces the file through a rename, so readers see either
/// the old contents or the new ones.
///
/// # Example
/// ```no_run
/// use oauth_relay::store::{FileSessionStore, SessionStore};
///
/// let store = FileSessionStore::new_default("default");
/// store.set("google|+|AccessToken", "ya29.token")?;
/// # Ok::<(), oauth_relay::error::OAuthError>(())
/// ```
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    scope: String,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(base_dir: impl Into<PathBuf>, scope: &str) -> Self {
        let scope = normalize_label(scope);
        let path = base_dir.into().join(format!("session.{scope}.toml"));
        Self {
            path,
            scope,
            guard: Mutex::new(()),
        }
    }

    pub fn new_default(scope: &str) -> Self {
        Self::new(default_base_dir(), scope)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, OAuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new())
            }
            Err(err) => return Err(OAuthError::Storage(err.to_string())),
        };
        let file: SessionFile = toml::from_str(&raw)?;
        Ok(file.values)
    }

    fn write(&self, values: BTreeMap<String, String>) -> Result<(), OAuthError> {
        let file = SessionFile {
            version: SESSION_FILE_VERSION,
            scope: self.scope.clone(),
            saved_at: Utc::now(),
            values,
        };
        write_atomic(&self.path, toml::to_string(&file)?.as_bytes())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), OAuthError> {
        let _guard = self.lock();
        let mut values = self.read()?;
        apply(&mut values);
        self.write(values)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, OAuthError> {
        let _guard = self.lock();
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), OAuthError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), OAuthError> {
        self.update(|values| {
            values.remove(key);
        })
    }

    fn set_many(&self, entries: &[(String, Option<String>)]) -> Result<(), OAuthError> {
        self.update(|values| {
            for (key, value) in entries {
                match value {
                    Some(value) => values.insert(key.clone(), value.clone()),
                    None => values.remove(key),
                };
            }
        })
    }

    fn clear(&self) -> Result<(), OAuthError> {
        let _guard = self.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(OAuthError::Storage(err.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    scope: String,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Write `data` to a sibling temp file created with owner-only permissions,
/// then rename it over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), OAuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file_name = path.file_name().ok_or_else(|| {
        OAuthError::Storage(format!("session path {} has no file name", path.display()))
    })?;
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_path = path.with_file_name(format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let written = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()
    })();
    if let Err(err) = written.and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

fn default_base_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".oauth-relay"))
        .unwrap_or_else(|| PathBuf::from(".oauth-relay"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn session_key_uses_provider_namespace() {
        assert_eq!(session_key("github", "RefreshToken"), "github|+|RefreshToken");
    }

    #[test]
    fn in_memory_store_set_get_remove() {
        let store = InMemorySessionStore::new();
        assert!(!store.contains("a").unwrap());
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert!(store.contains("a").unwrap());
        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn in_memory_clear_drops_everything() {
        let store = InMemorySessionStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.len(), 2);
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_round_trip_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "alice");
        store.set("google|+|AccessToken", "tok").unwrap();
        store.set("google|+|TokenType", "Bearer").unwrap();

        let reopened = FileSessionStore::new(dir.path(), "alice");
        assert_eq!(
            reopened.get("google|+|AccessToken").unwrap().as_deref(),
            Some("tok")
        );
        assert_eq!(
            reopened.get("google|+|TokenType").unwrap().as_deref(),
            Some("Bearer")
        );
    }

    #[test]
    fn file_store_scopes_are_isolated() {
        let dir = TempDir::new().unwrap();
        let alice = FileSessionStore::new(dir.path(), "alice");
        let bob = FileSessionStore::new(dir.path(), "bob");
        alice.set("k", "v").unwrap();
        assert!(bob.get("k").unwrap().is_none());
    }

    #[test]
    fn file_store_clear_missing_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "ghost");
        store.clear().unwrap();
        assert!(store.get("anything").unwrap().is_none());
    }

    #[test]
    fn file_store_set_many_replaces_and_removes_in_one_write() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "alice");
        store.set("github|+|RefreshToken", "old").unwrap();

        store
            .set_many(&[
                ("github|+|AccessToken".to_string(), Some("tok".to_string())),
                ("github|+|RefreshToken".to_string(), None),
            ])
            .unwrap();

        assert_eq!(store.get("github|+|AccessToken").unwrap().as_deref(), Some("tok"));
        assert!(store.get("github|+|RefreshToken").unwrap().is_none());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "alice");
        store.set("k", "v").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn file_store_readers_never_see_partial_writes() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileSessionStore::new(dir.path(), "shared"));
        store.set("google|+|AccessToken", "tok-0").unwrap();

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 1..=200 {
                    store
                        .set("google|+|AccessToken", &format!("tok-{i}"))
                        .unwrap();
                }
            })
        };
        // A second handle on the same file has its own guard, like another process.
        let other = FileSessionStore::new(dir.path(), "shared");
        for _ in 0..2000 {
            let from_shared = store.get("google|+|AccessToken").unwrap();
            let from_other = other.get("google|+|AccessToken").unwrap();
            assert!(from_shared.is_some_and(|v| v.starts_with("tok-")));
            assert!(from_other.is_some_and(|v| v.starts_with("tok-")));
        }
        writer.join().unwrap();
        assert_eq!(
            other.get("google|+|AccessToken").unwrap().as_deref(),
            Some("tok-200")
        );
    }

    /// Delegates to an in-memory store but fails the `fail_on`-th `set`.
    struct FailingStore {
        inner: InMemorySessionStore,
        sets: Mutex<usize>,
        fail_on: usize,
    }

    impl FailingStore {
        fn new(fail_on: usize) -> Self {
            Self {
                inner: InMemorySessionStore::new(),
                sets: Mutex::new(0),
                fail_on,
            }
        }
    }

    impl SessionStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<String>, OAuthError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), OAuthError> {
            let mut sets = self.sets.lock().unwrap();
            *sets += 1;
            if *sets == self.fail_on {
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
    fn default_set_many_restores_touched_keys_on_failure() {
        let store = FailingStore::new(4);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        let result = store.set_many(&[
            ("a".to_string(), Some("10".to_string())),
            ("b".to_string(), None),
            ("c".to_string(), Some("30".to_string())),
        ]);

        assert!(matches!(result, Err(OAuthError::Storage(msg)) if msg == "disk full"));
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
        assert!(store.get("c").unwrap().is_none());
    }

    #[test]
    fn normalize_label_replaces_unsafe_characters() {
        assert_eq!(normalize_label("User@Example"), "user-example");
        assert_eq!(normalize_label("  "), "default");
        assert_eq!(normalize_label("@@"), "default");
    }
}
