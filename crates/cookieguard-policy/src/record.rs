//! Consent records and their structural validation.
//!
//! Storage yields a [`RawConsentRecord`] where every field is optional.
//! [`validate_consent_record`] checks that the required fields are present and
//! `ConsentRecord::try_from` turns it into the typed form. Version and expiry
//! are not checked here; that is the store's job.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::generate_consent_id;
use crate::types::CategoryId;

/// Per-category consent decisions.
///
/// `essential` is always granted. Categories absent on the wire deserialize
/// as refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConsentCategories {
    functional: bool,
    analytics: bool,
    marketing: bool,
    personalization: bool,
}

impl ConsentCategories {
    /// Only the essential category granted.
    pub const fn essential_only() -> Self {
        Self {
            functional: false,
            analytics: false,
            marketing: false,
            personalization: false,
        }
    }

    /// Every category granted.
    pub const fn all_granted() -> Self {
        Self {
            functional: true,
            analytics: true,
            marketing: true,
            personalization: true,
        }
    }

    pub fn get(&self, id: CategoryId) -> bool {
        match id {
            CategoryId::Essential => true,
            CategoryId::Functional => self.functional,
            CategoryId::Analytics => self.analytics,
            CategoryId::Marketing => self.marketing,
            CategoryId::Personalization => self.personalization,
        }
    }

    /// Set a decision. Attempts to refuse `essential` are ignored.
    pub fn set(&mut self, id: CategoryId, granted: bool) {
        match id {
            CategoryId::Essential => {}
            CategoryId::Functional => self.functional = granted,
            CategoryId::Analytics => self.analytics = granted,
            CategoryId::Marketing => self.marketing = granted,
            CategoryId::Personalization => self.personalization = granted,
        }
    }

    pub fn with(mut self, id: CategoryId, granted: bool) -> Self {
        self.set(id, granted);
        self
    }

    /// Grant exactly the given categories (plus essential).
    pub fn granting(ids: impl IntoIterator<Item = CategoryId>) -> Self {
        ids.into_iter()
            .fold(Self::essential_only(), |acc, id| acc.with(id, true))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, bool)> + '_ {
        CategoryId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    /// Optional categories that are granted.
    pub fn granted_optional(&self) -> Vec<CategoryId> {
        self.iter()
            .filter(|(id, granted)| id.is_optional() && *granted)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn is_essential_only(&self) -> bool {
        *self == Self::essential_only()
    }

    pub fn is_all_granted(&self) -> bool {
        *self == Self::all_granted()
    }
}

impl fmt::Display for ConsentCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let granted: Vec<&str> = self
            .iter()
            .filter(|(_, g)| *g)
            .map(|(id, _)| id.as_str())
            .collect();
        f.write_str(&granted.join(","))
    }
}

impl Serialize for ConsentCategories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CategoryId::ALL.len()))?;
        for (id, granted) in self.iter() {
            map.serialize_entry(id.as_str(), &granted)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConsentCategories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Unknown keys are ignored so catalogs can drop a category without
        // invalidating records written by an older client.
        let raw = BTreeMap::<String, bool>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, granted)| key.parse::<CategoryId>().ok().map(|id| (id, granted)))
            .fold(Self::essential_only(), |acc, (id, granted)| {
                acc.with(id, granted)
            }))
    }
}

/// How consent was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMethod {
    Banner,
    Settings,
    Api,
}

impl ConsentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Settings => "settings",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for ConsentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consent record as read from storage, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConsentRecord {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub categories: Option<ConsentCategories>,
    #[serde(default)]
    pub consent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<ConsentMethod>,
}

/// Structural check of a stored record.
///
/// Fails when any of `timestamp`, `version`, `categories` or `consentId` is
/// missing. Empty strings count as missing.
pub fn validate_consent_record(record: &RawConsentRecord) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if record.timestamp.is_none() {
        missing.push("timestamp");
    }
    if record.version.as_deref().map_or(true, str::is_empty) {
        missing.push("version");
    }
    if record.categories.is_none() {
        missing.push("categories");
    }
    if record.consent_id.as_deref().map_or(true, str::is_empty) {
        missing.push("consentId");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { missing })
    }
}

/// A validated consent decision. Never mutated; every save creates a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub categories: ConsentCategories,
    pub consent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<ConsentMethod>,
}

impl ConsentRecord {
    /// New record stamped now, with a fresh consent id.
    pub fn new(
        version: impl Into<String>,
        categories: ConsentCategories,
        method: ConsentMethod,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            version: version.into(),
            categories,
            consent_id: generate_consent_id(),
            method: Some(method),
        }
    }

    /// Instant after which the record is void.
    ///
    /// `None` when the instant is past the representable range, which only
    /// happens for a corrupt timestamp; such a record is never valid.
    pub fn expires_at(&self, expiry_days: u32) -> Option<DateTime<Utc>> {
        self.timestamp
            .checked_add_signed(Duration::days(i64::from(expiry_days)))
    }
}

impl TryFrom<RawConsentRecord> for ConsentRecord {
    type Error = ValidationError;

    fn try_from(raw: RawConsentRecord) -> Result<Self, Self::Error> {
        validate_consent_record(&raw)?;
        Ok(Self {
            timestamp: raw.timestamp.unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
            categories: raw.categories.unwrap_or_default(),
            consent_id: raw.consent_id.unwrap_or_default(),
            method: raw.method,
        })
    }
}

impl From<&ConsentRecord> for RawConsentRecord {
    fn from(record: &ConsentRecord) -> Self {
        Self {
            timestamp: Some(record.timestamp),
            version: Some(record.version.clone()),
            categories: Some(record.categories),
            consent_id: Some(record.consent_id.clone()),
            method: record.method,
        }
    }
}
