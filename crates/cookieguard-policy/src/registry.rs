//! Read-only catalog of cookie categories with lookup helpers.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{PolicyError, PolicyResult};
use crate::record::ConsentCategories;
use crate::types::{CategoryId, CookieCategory, CookieDefinition, CookiePolicy};

const REFERENCE_POLICY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/policies/reference.yaml"
));

/// The cookie catalog plus a name index.
///
/// Construct once and share (`Arc<PolicyRegistry>`); nothing in here changes
/// after construction.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policy: CookiePolicy,
    owners: HashMap<String, CategoryId>,
}

impl PolicyRegistry {
    /// The catalog compiled into this crate.
    pub fn reference() -> PolicyResult<Self> {
        Self::from_yaml_str(REFERENCE_POLICY)
    }

    /// Parse and check a catalog.
    pub fn from_yaml_str(yaml: &str) -> PolicyResult<Self> {
        let policy: CookiePolicy = serde_yaml::from_str(yaml)?;
        Self::new(policy)
    }

    /// Load a catalog from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Check catalog invariants and build the index.
    ///
    /// - version is non-empty
    /// - exactly one category is essential, and it is `essential`
    /// - category ids are unique
    /// - a cookie name belongs to one category only
    pub fn new(policy: CookiePolicy) -> PolicyResult<Self> {
        if policy.version.trim().is_empty() {
            return Err(PolicyError::invalid("version must not be empty"));
        }

        let mut seen = HashSet::new();
        for category in &policy.categories {
            if !seen.insert(category.id) {
                return Err(PolicyError::invalid(format!(
                    "duplicate category: {}",
                    category.id
                )));
            }
            if category.essential != (category.id == CategoryId::Essential) {
                return Err(PolicyError::invalid(format!(
                    "category {} must {}be essential",
                    category.id,
                    if category.essential { "not " } else { "" }
                )));
            }
        }
        if !seen.contains(&CategoryId::Essential) {
            return Err(PolicyError::invalid("missing essential category"));
        }

        let mut owners = HashMap::new();
        for category in &policy.categories {
            for cookie in &category.cookies {
                if let Some(other) = owners.insert(cookie.name.clone(), category.id) {
                    return Err(PolicyError::invalid(format!(
                        "cookie {} listed in both {} and {}",
                        cookie.name, other, category.id
                    )));
                }
            }
        }

        Ok(Self { policy, owners })
    }

    /// The full policy document.
    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    pub fn version(&self) -> &str {
        &self.policy.version
    }

    pub fn categories(&self) -> &[CookieCategory] {
        &self.policy.categories
    }

    pub fn category(&self, id: CategoryId) -> Option<&CookieCategory> {
        self.policy.categories.iter().find(|c| c.id == id)
    }

    /// Category owning the named cookie.
    pub fn category_of(&self, cookie_name: &str) -> Option<&CookieCategory> {
        self.owners
            .get(cookie_name)
            .and_then(|id| self.category(*id))
    }

    pub fn cookie(&self, cookie_name: &str) -> Option<&CookieDefinition> {
        self.category_of(cookie_name)
            .and_then(|c| c.cookies.iter().find(|cookie| cookie.name == cookie_name))
    }

    /// Cookies defined for a category; empty if the catalog lacks it.
    pub fn cookies_in(&self, id: CategoryId) -> &[CookieDefinition] {
        self.category(id).map(|c| c.cookies.as_slice()).unwrap_or(&[])
    }

    /// Whether the cookie may be set under the given decisions.
    ///
    /// Unknown cookies are never allowed. A category that was never decided
    /// and one that was refused are treated the same.
    pub fn is_cookie_allowed(&self, cookie_name: &str, consent: &ConsentCategories) -> bool {
        match self.category_of(cookie_name) {
            Some(category) => category.essential || consent.get(category.id),
            None => false,
        }
    }

    /// Decisions before the user has chosen anything.
    pub fn default_consent(&self) -> ConsentCategories {
        ConsentCategories::essential_only()
    }

    /// Decisions for "accept all".
    pub fn all_granted(&self) -> ConsentCategories {
        ConsentCategories::all_granted()
    }
}
