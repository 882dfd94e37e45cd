//! Consent manager configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConsentError, ConsentResult};

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "cookie-consent";

/// Consent lifetime in days.
pub const DEFAULT_EXPIRY_DAYS: u32 = 365;

/// Longest accepted consent lifetime (ten years).
pub const MAX_EXPIRY_DAYS: u32 = 3650;

/// Timeout for the audit POST, in seconds.
pub const DEFAULT_AUDIT_TIMEOUT_SECS: u64 = 5;

/// Settings fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Policy version records are checked against. Defaults to the catalog's.
    #[serde(default)]
    pub version: Option<String>,

    /// Days a record stays valid after it was given.
    #[serde(default = "default_expiry_days")]
    pub expiry_days: u32,

    /// Key the record is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Audit endpoint. No audit trail is sent when unset.
    #[serde(default)]
    pub audit_endpoint: Option<String>,

    /// Audit request timeout in seconds.
    #[serde(default = "default_audit_timeout")]
    pub audit_timeout_secs: u64,
}

fn default_expiry_days() -> u32 {
    DEFAULT_EXPIRY_DAYS
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_audit_timeout() -> u64 {
    DEFAULT_AUDIT_TIMEOUT_SECS
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            version: None,
            expiry_days: default_expiry_days(),
            storage_key: default_storage_key(),
            audit_endpoint: None,
            audit_timeout_secs: default_audit_timeout(),
        }
    }
}

impl ConsentConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `COOKIEGUARD_STORAGE_KEY` | Storage key |
    /// | `COOKIEGUARD_EXPIRY_DAYS` | Consent lifetime in days |
    /// | `COOKIEGUARD_POLICY_VERSION` | Override the catalog version |
    /// | `COOKIEGUARD_AUDIT_URL` | Audit endpoint |
    /// | `COOKIEGUARD_AUDIT_TIMEOUT` | Audit timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            version: std::env::var("COOKIEGUARD_POLICY_VERSION")
                .ok()
                .filter(|v| !v.is_empty()),
            expiry_days: std::env::var("COOKIEGUARD_EXPIRY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_expiry_days),
            storage_key: std::env::var("COOKIEGUARD_STORAGE_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_storage_key),
            audit_endpoint: std::env::var("COOKIEGUARD_AUDIT_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            audit_timeout_secs: std::env::var("COOKIEGUARD_AUDIT_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_audit_timeout),
        }
    }

    /// Load config from a YAML file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> ConsentResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConsentError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            ConsentError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the consent flow cannot work with.
    pub fn validate(&self) -> ConsentResult<()> {
        if self.expiry_days == 0 {
            return Err(ConsentError::config("expiry_days must be at least 1"));
        }
        if self.expiry_days > MAX_EXPIRY_DAYS {
            return Err(ConsentError::config(format!(
                "expiry_days must be at most {MAX_EXPIRY_DAYS}, got {}",
                self.expiry_days
            )));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConsentError::config("storage_key must not be empty"));
        }
        if matches!(&self.version, Some(v) if v.trim().is_empty()) {
            return Err(ConsentError::config("version must not be empty"));
        }
        if let Some(endpoint) = &self.audit_endpoint {
            url::Url::parse(endpoint).map_err(|e| {
                ConsentError::config(format!("invalid audit endpoint {endpoint}: {e}"))
            })?;
        }
        if self.audit_timeout_secs == 0 {
            return Err(ConsentError::config("audit_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_expiry_days(mut self, days: u32) -> Self {
        self.expiry_days = days;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_audit_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.audit_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_audit_timeout(mut self, secs: u64) -> Self {
        self.audit_timeout_secs = secs;
        self
    }
}
