//! Cookie catalog and consent-record primitives.
//!
//! This crate is the policy registry of cookieguard:
//!
//! - the cookie catalog (categories, cookie definitions, legal metadata),
//!   loaded from YAML and checked for invariants on load
//! - the typed [`ConsentCategories`] map keyed by [`CategoryId`]
//! - structural validation of stored consent records
//! - consent id generation
//!
//! # Quick Start
//!
//! ```
//! use cookieguard_policy::{CategoryId, ConsentCategories, PolicyRegistry};
//!
//! # fn example() -> cookieguard_policy::PolicyResult<()> {
//! let registry = PolicyRegistry::reference()?;
//! let consent = ConsentCategories::granting([CategoryId::Analytics]);
//!
//! assert!(registry.is_cookie_allowed("_ga", &consent));
//! assert!(!registry.is_cookie_allowed("_fbp", &consent));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod error;
mod id;
pub mod record;
pub mod registry;
pub mod types;

pub use error::{PolicyError, PolicyResult, ValidationError};
pub use id::generate_consent_id;
pub use record::{
    validate_consent_record, ConsentCategories, ConsentMethod, ConsentRecord, RawConsentRecord,
};
pub use registry::PolicyRegistry;
pub use types::{
    CategoryId, ContactInfo, CookieCategory, CookieDefinition, CookiePolicy, CookieType, SameSite,
    UnknownCategory, UserRight,
};
