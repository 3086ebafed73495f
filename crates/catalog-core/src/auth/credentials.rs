//! Single-slot persisted storage for the bearer token.
//!
//! The slot behaves like a browser cookie: one value, written with an expiry
//! and scope attributes, replaced wholesale on every write, and unreadable
//! once the expiry has passed.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Name of the stored slot.
pub const TOKEN_KEY: &str = "access_token";

/// Keychain service name
const SERVICE_NAME: &str = "catalog-admin";

/// Tokens are kept for one day after login.
const TOKEN_EXPIRY_DAYS: i64 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Credential storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored credential is malformed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

/// Expiry and scope attributes set when the token is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub max_age: Duration,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            max_age: Duration::days(TOKEN_EXPIRY_DAYS),
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure: false,
        }
    }
}

/// What actually lands in storage.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
    pub written_at: DateTime<Utc>,
}

impl StoredCredential {
    pub fn new(value: &str, attrs: &CookieAttributes) -> Self {
        let now = Utc::now();
        Self {
            value: value.to_string(),
            expires_at: now + attrs.max_age,
            path: attrs.path.clone(),
            same_site: attrs.same_site,
            secure: attrs.secure,
            written_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("path", &self.path)
            .field("same_site", &self.same_site)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Durable single-token slot.
pub trait CredentialStore: Send + Sync {
    /// Replace whatever is stored with `value`.
    fn write(&self, value: &str, attrs: &CookieAttributes) -> Result<(), StoreError>;

    /// The stored value, or `None` when empty or expired.
    fn read(&self) -> Result<Option<String>, StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

// ============================================================================
// File store
// ============================================================================

/// Token slot persisted as a JSON file in the cache directory.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{}.json", TOKEN_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn write(&self, value: &str, attrs: &CookieAttributes) -> Result<(), StoreError> {
        let record = StoredCredential::new(value, attrs);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&record)?;

        // Write-then-rename so a failed write never leaves a torn file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = ?self.path, expires_at = %record.expires_at, "Token written");
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let record: StoredCredential = serde_json::from_str(&contents)?;
        if record.is_expired() {
            debug!(expires_at = %record.expires_at, "Stored token expired");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(record.value))
    }

    fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

// ============================================================================
// Keyring store
// ============================================================================

/// Token slot kept in the OS keychain.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, TOKEN_KEY)?)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn write(&self, value: &str, attrs: &CookieAttributes) -> Result<(), StoreError> {
        let record = StoredCredential::new(value, attrs);
        self.entry()?.set_password(&serde_json::to_string(&record)?)?;
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        let secret = match self.entry()?.get_password() {
            Ok(secret) => secret,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: StoredCredential = serde_json::from_str(&secret)?;
        if record.is_expired() {
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(record.value))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local slot. Used by tests and `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<StoredCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record, including expiry metadata.
    pub fn record(&self) -> Option<StoredCredential> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn write(&self, value: &str, attrs: &CookieAttributes) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(StoredCredential::new(value, attrs));
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        if slot.as_ref().is_some_and(StoredCredential::is_expired) {
            *slot = None;
        }
        Ok(slot.as_ref().map(|r| r.value.clone()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}
