//! Durable storage for the bearer/renewal token pair.
//!
//! Only the session store writes here. Backends are plain key-value stores
//! keyed by `accessToken` and `refreshToken`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

use crate::models::BackendUser;

/// Storage key for the bearer token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the renewal token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key for the normalized account, used when the access token
/// carries no user claims of its own
pub const ACCOUNT_KEY: &str = "user";

/// Keyring service name
const SERVICE_NAME: &str = "mpadmin";

/// Credential file name in cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

pub trait CredentialStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// The persisted login session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub account: Option<BackendUser>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("account", &self.account)
            .finish()
    }
}

impl Credential {
    /// Load the credential; `None` when no access token is stored.
    pub fn load(storage: &dyn CredentialStorage) -> Result<Option<Self>> {
        let access_token = match storage.get(ACCESS_TOKEN_KEY)? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(None),
        };
        let refresh_token = storage.get(REFRESH_TOKEN_KEY)?.filter(|t| !t.is_empty());
        let account = match storage.get(ACCOUNT_KEY)? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(account) => Some(account),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable stored account");
                    None
                }
            },
            None => None,
        };
        Ok(Some(Self {
            access_token,
            refresh_token,
            account,
        }))
    }

    /// Persist the access token, plus the refresh token and account when
    /// present. Absent ones leave any stored value in place.
    pub fn save(&self, storage: &dyn CredentialStorage) -> Result<()> {
        storage.set(ACCESS_TOKEN_KEY, &self.access_token)?;
        if let Some(ref refresh) = self.refresh_token {
            storage.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        if let Some(ref account) = self.account {
            let json = serde_json::to_string(account).context("Failed to serialize account")?;
            storage.set(ACCOUNT_KEY, &json)?;
        }
        Ok(())
    }

    /// Remove every stored entry. Attempts all removals even if one fails.
    pub fn clear(storage: &dyn CredentialStorage) -> Result<()> {
        let access = storage.remove(ACCESS_TOKEN_KEY);
        let refresh = storage.remove(REFRESH_TOKEN_KEY);
        let account = storage.remove(ACCOUNT_KEY);
        access.and(refresh).and(account)
    }
}

/// In-process storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("credential storage lock poisoned"))
    }
}

impl CredentialStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// JSON key-value file in the cache directory.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(CREDENTIALS_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credentials file")?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&tmp, contents).context("Failed to write credentials file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace credentials file")?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("credential file lock poisoned"))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl CredentialStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// OS keychain storage, one keyring entry per key.
pub struct KeyringStorage {
    service: String,
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl KeyringStorage {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl CredentialStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => {
                debug!(key, "No keychain entry to delete");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
