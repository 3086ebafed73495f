//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! API location, tenant selection, token storage settings, and the last used
//! username. Environment variables override the file.
//!
//! Configuration is stored at `~/.config/catalog-admin/config.json`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{
    ClaimsPolicy, CookieAttributes, CredentialStore, FileCredentialStore, KeyringCredentialStore,
};
use crate::resources::TenantResolver;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "catalog-admin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Where the bearer token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the catalog API, e.g. `https://api.example.com/api/v1/`
    pub api_url: Option<String>,
    /// Deployment tenant
    pub tenant_id: Option<String>,
    /// Prefer the token's `tenantId` claim over `tenant_id`
    #[serde(default)]
    pub tenant_from_token: bool,
    /// Mark the stored token secure-only (production deployments)
    #[serde(default)]
    pub cookie_secure: bool,
    /// Treat undecodable tokens as signed out
    #[serde(default)]
    pub strict_claims: bool,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    pub request_timeout_secs: Option<u64>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply `CATALOG_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unset or empty keys are skipped.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("CATALOG_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(tenant) = get("CATALOG_TENANT_ID") {
            self.tenant_id = Some(tenant);
        }
        if let Some(flag) = get("CATALOG_TENANT_FROM_TOKEN") {
            self.tenant_from_token = parse_flag(&flag);
        }
        if let Some(flag) = get("CATALOG_COOKIE_SECURE") {
            self.cookie_secure = parse_flag(&flag);
        }
        if let Some(flag) = get("CATALOG_STRICT_CLAIMS") {
            self.strict_claims = parse_flag(&flag);
        }
        if let Some(backend) = get("CATALOG_CREDENTIAL_BACKEND") {
            match backend.trim().to_ascii_lowercase().as_str() {
                "keyring" => self.credential_backend = CredentialBackend::Keyring,
                "file" => self.credential_backend = CredentialBackend::File,
                other => tracing::warn!(backend = other, "Unknown credential backend, ignoring"),
            }
        }
        if let Some(secs) = get("CATALOG_REQUEST_TIMEOUT_SECS") {
            match secs.trim().parse() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => tracing::warn!(value = %secs, "Invalid request timeout, ignoring"),
            }
        }
    }

    pub fn api_url(&self) -> Result<&str> {
        self.api_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No API URL configured; set CATALOG_API_URL"))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn tenant_resolver(&self) -> Result<TenantResolver> {
        if self.tenant_from_token {
            return Ok(TenantResolver::FromSession {
                fallback: self.tenant_id.clone(),
            });
        }
        let tenant = self
            .tenant_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No tenant configured; set CATALOG_TENANT_ID"))?;
        Ok(TenantResolver::Fixed(tenant))
    }

    pub fn cookie_attributes(&self) -> CookieAttributes {
        CookieAttributes {
            secure: self.cookie_secure,
            ..CookieAttributes::default()
        }
    }

    pub fn claims_policy(&self) -> ClaimsPolicy {
        if self.strict_claims {
            ClaimsPolicy::Strict
        } else {
            ClaimsPolicy::Lenient
        }
    }

    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        Ok(match self.credential_backend {
            CredentialBackend::File => Arc::new(FileCredentialStore::new(&self.cache_dir()?)),
            CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
