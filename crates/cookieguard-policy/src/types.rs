//! Catalog types: categories, cookie definitions and the policy document.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closed set of cookie category identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Essential,
    Functional,
    Analytics,
    Marketing,
    Personalization,
}

impl CategoryId {
    /// Every category, in display order.
    pub const ALL: [CategoryId; 5] = [
        CategoryId::Essential,
        CategoryId::Functional,
        CategoryId::Analytics,
        CategoryId::Marketing,
        CategoryId::Personalization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::Functional => "functional",
            Self::Analytics => "analytics",
            Self::Marketing => "marketing",
            Self::Personalization => "personalization",
        }
    }

    /// Whether consent for this category can be refused.
    pub fn is_optional(self) -> bool {
        self != Self::Essential
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cookie category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for CategoryId {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Lifetime class of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieType {
    Session,
    Persistent,
}

/// `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

/// A single cookie the site may set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieDefinition {
    /// Cookie name as it appears in the jar.
    pub name: String,

    /// Declared domain. `None` means a host-only cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default = "default_path")]
    pub path: String,

    pub purpose: String,

    /// Human-readable lifetime ("13 months", "Session").
    pub duration: String,

    #[serde(rename = "type")]
    pub cookie_type: CookieType,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,

    #[serde(default)]
    pub same_site: SameSite,

    pub processor: String,

    /// Country where the processor stores the data.
    pub country: String,

    #[serde(default)]
    pub personal_data: bool,
}

fn default_path() -> String {
    "/".to_string()
}

/// A group of cookies sharing a purpose and a consent decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: String,

    /// Essential categories are always consented and cannot be toggled.
    #[serde(default)]
    pub essential: bool,

    pub purpose: String,
    pub legal_basis: String,
    pub data_transfer: String,
    pub retention: String,

    #[serde(default)]
    pub processors: Vec<String>,

    #[serde(default)]
    pub cookies: Vec<CookieDefinition>,
}

/// A data-subject right listed in the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRight {
    pub name: String,
    pub description: String,
}

/// Data controller contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub controller: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpo_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// The complete cookie policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePolicy {
    /// Policy version. Stored consent for any other version is void.
    pub version: String,

    pub last_updated: NaiveDate,

    pub categories: Vec<CookieCategory>,

    #[serde(default)]
    pub legal_framework: Vec<String>,

    #[serde(default)]
    pub user_rights: Vec<UserRight>,

    pub contact_info: ContactInfo,
}
