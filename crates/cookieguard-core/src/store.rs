//! Persistence of the current consent record.
//!
//! Reads never fail the caller: missing, unreadable, corrupt or structurally
//! invalid data all come back as `None`, which the manager treats as
//! "no consent" (banner shown, optional cookies blocked).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cookieguard_policy::{ConsentRecord, RawConsentRecord};
use tracing::{debug, warn};

use crate::config::ConsentConfig;
use crate::error::StorageError;
use crate::storage::ConsentStorage;

/// Owns the persisted consent record for one storage key.
#[derive(Clone)]
pub struct ConsentStore {
    storage: Arc<dyn ConsentStorage>,
    key: String,
    version: String,
    expiry_days: u32,
}

impl fmt::Debug for ConsentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentStore")
            .field("key", &self.key)
            .field("version", &self.version)
            .field("expiry_days", &self.expiry_days)
            .finish_non_exhaustive()
    }
}

impl ConsentStore {
    /// `current_version` is the policy version records must match.
    pub fn new(
        storage: Arc<dyn ConsentStorage>,
        config: &ConsentConfig,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            key: config.storage_key.clone(),
            version: current_version.into(),
            expiry_days: config.expiry_days,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn expiry_days(&self) -> u32 {
        self.expiry_days
    }

    /// Last saved record, or `None` if absent or unusable.
    pub fn load(&self) -> Option<ConsentRecord> {
        let content = match self.storage.get(&self.key) {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!(key = %self.key, "no stored consent");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read consent, treating as none");
                return None;
            }
        };

        let raw: RawConsentRecord = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored consent is not valid JSON");
                return None;
            }
        };

        match ConsentRecord::try_from(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored consent is malformed");
                None
            }
        }
    }

    /// Stored record if it is still valid now.
    pub fn load_valid(&self) -> Option<ConsentRecord> {
        self.load().filter(|record| self.is_valid(record))
    }

    /// Replace the stored record.
    pub fn save(&self, record: &ConsentRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record).map_err(|e| StorageError::Write {
            key: self.key.clone(),
            message: format!("failed to serialize consent: {e}"),
        })?;
        self.storage.set(&self.key, &json)?;
        debug!(key = %self.key, consent_id = %record.consent_id, "saved consent");
        Ok(())
    }

    /// Version matches and the record has not expired.
    pub fn is_valid(&self, record: &ConsentRecord) -> bool {
        self.is_valid_at(record, Utc::now())
    }

    pub fn is_valid_at(&self, record: &ConsentRecord, now: DateTime<Utc>) -> bool {
        if record.version != self.version {
            debug!(
                stored = %record.version,
                current = %self.version,
                "consent recorded for another policy version"
            );
            return false;
        }
        let Some(expires_at) = record.expires_at(self.expiry_days) else {
            warn!(
                consent_id = %record.consent_id,
                timestamp = %record.timestamp,
                "consent timestamp out of range, treating as invalid"
            );
            return false;
        };
        if now >= expires_at {
            debug!(expires_at = %expires_at, "consent expired");
            return false;
        }
        true
    }

    /// Remove the stored record. Failures are logged only.
    pub fn clear(&self) {
        match self.storage.remove(&self.key) {
            Ok(()) => debug!(key = %self.key, "cleared consent"),
            Err(e) => warn!(key = %self.key, error = %e, "failed to clear consent"),
        }
    }
}
