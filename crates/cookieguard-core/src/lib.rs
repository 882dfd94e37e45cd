//! Cookie consent store, enforcement and manager.
//!
//! This crate wires the cookie catalog from `cookieguard-policy` into a
//! working consent flow:
//!
//! - [`ConsentStore`]: persist, load and validate the consent record
//! - [`ConsentEnforcer`]: delete refused cookies and set third-party signals
//! - [`ConsentManager`]: observable state with accept/reject/customize/withdraw
//! - [`HttpAuditSink`]: optional fire-and-forget audit POST
//!
//! Storage, cookie jar, third-party scripts and the audit trail are injected
//! capabilities, so a browser binding, a server-side middleware and a test
//! can each supply their own.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use cookieguard_core::{ConsentManager, ConsentState, MemoryCookieJar, PolicyRegistry};
//!
//! # fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(PolicyRegistry::reference()?);
//! let jar = Arc::new(MemoryCookieJar::new());
//! jar.set("_ga", "GA1.2.3", Some(".example.com"), "/");
//!
//! let mut manager = ConsentManager::builder(registry)
//!     .cookie_jar(jar.clone())
//!     .build()?;
//!
//! assert_eq!(manager.mount(), ConsentState::NoConsent);
//! assert!(!jar.contains("_ga"));
//!
//! manager.accept_all()?;
//! assert!(manager.is_cookie_allowed("_ga"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `COOKIEGUARD_STORAGE_KEY` | Storage key (default: `cookie-consent`) |
//! | `COOKIEGUARD_EXPIRY_DAYS` | Consent lifetime in days (default: 365) |
//! | `COOKIEGUARD_POLICY_VERSION` | Override the catalog version |
//! | `COOKIEGUARD_AUDIT_URL` | Audit endpoint (disabled when unset) |
//! | `COOKIEGUARD_AUDIT_TIMEOUT` | Audit timeout in seconds (default: 5) |

pub mod audit;
pub mod config;
pub mod enforcer;
pub mod error;
pub mod manager;
pub mod storage;
pub mod store;

pub use audit::{AuditRecord, AuditSink, ClientContext, HttpAuditSink, NoopAuditSink};
pub use config::ConsentConfig;
pub use enforcer::{
    ConsentEnforcer, ConsentSignals, CookieDeletion, CookieJar, EnforcementReport,
    HeaderCookieJar, MemoryCookieJar, NoopThirdPartyConsent, SharedConsentSignals, SignalState,
    ThirdPartyConsent,
};
pub use error::{ConsentError, ConsentResult, ListenerError, StorageError};
pub use manager::{
    ConsentChange, ConsentManager, ConsentManagerBuilder, ConsentState, Coverage, SubscriptionId,
};
pub use storage::{ConsentStorage, FileStorage, MemoryStorage};
pub use store::ConsentStore;

pub use cookieguard_policy::{
    CategoryId, ConsentCategories, ConsentMethod, ConsentRecord, PolicyRegistry,
};
