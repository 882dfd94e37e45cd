//! Observable consent state and the user actions that change it.
//!
//! # Session state machine
//!
//! ```text
//!            accept_all / reject_all / save_custom
//! NoConsent ───────────────────────────────────────▶ ConsentGiven ◀─┐
//!     ▲                                                │   │        │ re-save
//!     │ expiry / version mismatch                      │   └────────┘
//!     └────────────────────────────────────────────────┤
//!                                                      │ withdraw
//!                                                      ▼
//!                                                  Withdrawn ── any save ──▶ ConsentGiven
//! ```
//!
//! `Withdrawn` enforces exactly like `NoConsent` but is reported separately,
//! so a withdrawal is distinguishable from "never asked".

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cookieguard_policy::{
    CategoryId, ConsentCategories, ConsentMethod, ConsentRecord, PolicyRegistry,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audit::{AuditRecord, AuditSink, ClientContext, NoopAuditSink};
use crate::config::ConsentConfig;
use crate::enforcer::{
    ConsentEnforcer, CookieJar, EnforcementReport, MemoryCookieJar, NoopThirdPartyConsent,
    ThirdPartyConsent,
};
use crate::error::{ConsentError, ConsentResult, ListenerError};
use crate::storage::{ConsentStorage, MemoryStorage};
use crate::store::ConsentStore;

/// How much of the catalog is consented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Partial,
    Full,
}

/// Consent state of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConsentState {
    /// Nothing decided (or the decision expired). Banner must be shown.
    NoConsent,
    /// A valid decision is in force.
    ConsentGiven { coverage: Coverage },
    /// The user withdrew consent in this session.
    Withdrawn,
}

impl ConsentState {
    pub fn is_given(&self) -> bool {
        matches!(self, Self::ConsentGiven { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoConsent => "no_consent",
            Self::ConsentGiven {
                coverage: Coverage::Partial,
            } => "consent_given (partial)",
            Self::ConsentGiven {
                coverage: Coverage::Full,
            } => "consent_given (full)",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for ConsentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Event delivered to subscribers after every consent change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentChange {
    pub state: ConsentState,
    pub categories: ConsentCategories,
    /// The record now in force; `None` after a withdrawal or reset.
    pub record: Option<ConsentRecord>,
}

/// Handle returned by [`ConsentManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&ConsentChange) -> Result<(), ListenerError> + Send + Sync>;

/// Builder for [`ConsentManager`]. Unset capabilities get in-memory or no-op
/// defaults.
pub struct ConsentManagerBuilder {
    registry: Arc<PolicyRegistry>,
    config: ConsentConfig,
    storage: Option<Arc<dyn ConsentStorage>>,
    jar: Option<Arc<dyn CookieJar>>,
    third_party: Option<Arc<dyn ThirdPartyConsent>>,
    audit: Option<Arc<dyn AuditSink>>,
    client: ClientContext,
}

impl ConsentManagerBuilder {
    pub fn config(mut self, config: ConsentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn ConsentStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn cookie_jar(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn third_party(mut self, third_party: Arc<dyn ThirdPartyConsent>) -> Self {
        self.third_party = Some(third_party);
        self
    }

    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn client_context(mut self, client: ClientContext) -> Self {
        self.client = client;
        self
    }

    pub fn build(self) -> ConsentResult<ConsentManager> {
        self.config.validate()?;

        let version = self
            .config
            .version
            .clone()
            .unwrap_or_else(|| self.registry.version().to_string());
        if version != self.registry.version() {
            warn!(
                configured = %version,
                catalog = %self.registry.version(),
                "policy version overridden by configuration"
            );
        }

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let jar = self.jar.unwrap_or_else(|| Arc::new(MemoryCookieJar::new()));
        let third_party = self
            .third_party
            .unwrap_or_else(|| Arc::new(NoopThirdPartyConsent));

        let draft = self.registry.default_consent();
        Ok(ConsentManager {
            store: ConsentStore::new(storage, &self.config, version),
            enforcer: ConsentEnforcer::new(self.registry.clone(), jar, third_party),
            audit: self.audit.unwrap_or_else(|| Arc::new(NoopAuditSink)),
            client: self.client,
            registry: self.registry,
            state: ConsentState::NoConsent,
            categories: draft,
            draft,
            record: None,
            consent_required: true,
            listeners: Vec::new(),
            next_subscription: 0,
        })
    }
}

/// Consent state plus the actions a banner or settings page exposes.
///
/// Each instance owns its storage key; independent instances do not share
/// state.
pub struct ConsentManager {
    registry: Arc<PolicyRegistry>,
    store: ConsentStore,
    enforcer: ConsentEnforcer,
    audit: Arc<dyn AuditSink>,
    client: ClientContext,
    state: ConsentState,
    categories: ConsentCategories,
    draft: ConsentCategories,
    record: Option<ConsentRecord>,
    consent_required: bool,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for ConsentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentManager")
            .field("store", &self.store)
            .field("state", &self.state)
            .field("categories", &self.categories)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl ConsentManager {
    pub fn builder(registry: Arc<PolicyRegistry>) -> ConsentManagerBuilder {
        ConsentManagerBuilder {
            registry,
            config: ConsentConfig::default(),
            storage: None,
            jar: None,
            third_party: None,
            audit: None,
            client: ClientContext::default(),
        }
    }

    /// Load the stored decision and apply it.
    ///
    /// A missing, corrupt, stale or expired record leaves the manager in
    /// `NoConsent` with a draft of essential-only.
    pub fn mount(&mut self) -> ConsentState {
        match self.store.load() {
            Some(record) if self.store.is_valid(&record) => {
                debug!(consent_id = %record.consent_id, "restored stored consent");
                self.adopt(record);
            }
            Some(record) => {
                info!(
                    consent_id = %record.consent_id,
                    version = %record.version,
                    "stored consent no longer valid, asking again"
                );
                self.reset(ConsentState::NoConsent);
            }
            None => self.reset(ConsentState::NoConsent),
        }
        self.apply_enforcement();
        self.state
    }

    pub fn state(&self) -> ConsentState {
        self.state
    }

    /// Whether the banner must be shown.
    pub fn consent_required(&self) -> bool {
        self.consent_required
    }

    /// Decisions currently enforced.
    pub fn categories(&self) -> ConsentCategories {
        self.categories
    }

    /// Decisions being edited in the settings view.
    pub fn draft(&self) -> ConsentCategories {
        self.draft
    }

    pub fn current_record(&self) -> Option<&ConsentRecord> {
        self.record.as_ref()
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ConsentStore {
        &self.store
    }

    pub fn is_cookie_allowed(&self, cookie_name: &str) -> bool {
        self.registry
            .is_cookie_allowed(cookie_name, &self.categories)
    }

    /// Change one decision in the draft. Essential stays granted.
    pub fn set_draft(&mut self, id: CategoryId, granted: bool) {
        self.draft.set(id, granted);
    }

    pub fn accept_all(&mut self) -> ConsentResult<ConsentRecord> {
        let categories = self.registry.all_granted();
        self.save_with_method(categories, ConsentMethod::Banner)
    }

    pub fn reject_all(&mut self) -> ConsentResult<ConsentRecord> {
        let categories = self.registry.default_consent();
        self.save_with_method(categories, ConsentMethod::Banner)
    }

    pub fn save_custom(&mut self, categories: ConsentCategories) -> ConsentResult<ConsentRecord> {
        self.save_with_method(categories, ConsentMethod::Settings)
    }

    /// Save the draft as edited through [`set_draft`](Self::set_draft).
    pub fn save_draft(&mut self) -> ConsentResult<ConsentRecord> {
        self.save_custom(self.draft)
    }

    /// Record a decision and apply it.
    ///
    /// The decision takes effect in memory even if persisting it fails; the
    /// storage error is then returned so the caller can tell the user it
    /// will not survive a reload.
    pub fn save_with_method(
        &mut self,
        categories: ConsentCategories,
        method: ConsentMethod,
    ) -> ConsentResult<ConsentRecord> {
        let record = ConsentRecord::new(self.store.version(), categories, method);

        let saved = self.store.save(&record);
        if let Err(e) = &saved {
            warn!(
                consent_id = %record.consent_id,
                error = %e,
                "failed to persist consent, keeping it for this session only"
            );
        }

        self.adopt(record.clone());
        self.apply_enforcement();
        self.notify();
        self.audit
            .submit(AuditRecord::from_record(&record, &self.client));

        info!(
            consent_id = %record.consent_id,
            method = %method,
            categories = %record.categories,
            "consent updated"
        );

        saved.map(|()| record).map_err(ConsentError::from)
    }

    /// Withdraw consent: forget the stored record and block optional cookies.
    pub fn withdraw(&mut self) {
        let previous = self.record.as_ref().map(|r| r.consent_id.clone());
        self.store.clear();
        self.reset(ConsentState::Withdrawn);
        self.apply_enforcement();
        self.notify();
        info!(previous = ?previous, "consent withdrawn");
    }

    /// Re-check the record in force against version and expiry.
    ///
    /// Returns `false` (and falls back to `NoConsent`) if it is no longer
    /// valid. Sessions without a record are left alone.
    pub fn revalidate(&mut self) -> bool {
        self.revalidate_at(Utc::now())
    }

    pub fn revalidate_at(&mut self, now: DateTime<Utc>) -> bool {
        let Some(record) = &self.record else {
            return true;
        };
        if self.store.is_valid_at(record, now) {
            return true;
        }

        info!(consent_id = %record.consent_id, "consent expired during session");
        self.store.clear();
        self.reset(ConsentState::NoConsent);
        self.apply_enforcement();
        self.notify();
        false
    }

    /// Register a listener called synchronously after every change.
    ///
    /// A listener that errors or panics is logged and skipped; the remaining
    /// listeners still run and the action still succeeds.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&ConsentChange) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Enforce the current decisions again, e.g. after a page set cookies.
    pub fn enforce(&self) -> EnforcementReport {
        self.enforcer.enforce(&self.categories)
    }

    fn adopt(&mut self, record: ConsentRecord) {
        self.state = ConsentState::ConsentGiven {
            coverage: self.coverage(&record.categories),
        };
        self.categories = record.categories;
        self.draft = record.categories;
        self.consent_required = false;
        self.record = Some(record);
    }

    fn reset(&mut self, state: ConsentState) {
        let defaults = self.registry.default_consent();
        self.state = state;
        self.categories = defaults;
        self.draft = defaults;
        self.consent_required = true;
        self.record = None;
    }

    fn coverage(&self, categories: &ConsentCategories) -> Coverage {
        let full = self
            .registry
            .categories()
            .iter()
            .all(|c| categories.get(c.id));
        if full {
            Coverage::Full
        } else {
            Coverage::Partial
        }
    }

    fn apply_enforcement(&self) {
        self.enforcer.enforce(&self.categories);
        self.enforcer
            .configure_third_party_consent(&self.categories);
    }

    fn notify(&self) {
        let change = ConsentChange {
            state: self.state,
            categories: self.categories,
            record: self.record.clone(),
        };

        for (id, listener) in &self.listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&change))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(subscription = id.0, error = %e, "consent listener failed");
                }
                Err(_) => {
                    warn!(subscription = id.0, "consent listener panicked");
                }
            }
        }
    }
}
