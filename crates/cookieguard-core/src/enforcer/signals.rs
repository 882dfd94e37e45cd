//! Consent signals for third-party tags (Google Consent Mode style).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use cookieguard_policy::{CategoryId, ConsentCategories};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    Granted,
    Denied,
}

impl From<bool> for SignalState {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Signals handed to analytics and advertising scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSignals {
    pub analytics_storage: SignalState,
    pub ad_storage: SignalState,
    pub ad_user_data: SignalState,
    pub ad_personalization: SignalState,
    pub functionality_storage: SignalState,
    pub personalization_storage: SignalState,
    pub security_storage: SignalState,
}

impl ConsentSignals {
    pub fn from_categories(categories: &ConsentCategories) -> Self {
        let marketing = SignalState::from(categories.get(CategoryId::Marketing));
        Self {
            analytics_storage: categories.get(CategoryId::Analytics).into(),
            ad_storage: marketing,
            ad_user_data: marketing,
            ad_personalization: marketing,
            functionality_storage: categories.get(CategoryId::Functional).into(),
            personalization_storage: categories.get(CategoryId::Personalization).into(),
            security_storage: SignalState::Granted,
        }
    }

    /// Everything optional denied.
    pub fn denied() -> Self {
        Self::from_categories(&ConsentCategories::essential_only())
    }
}

/// Receiver of consent signals, e.g. a bridge to `gtag('consent', ...)`.
pub trait ThirdPartyConsent: Send + Sync {
    /// Whether the third-party script is present. Updates are skipped if not.
    fn is_available(&self) -> bool {
        true
    }

    fn update(&self, signals: &ConsentSignals);
}

/// No third-party scripts on the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopThirdPartyConsent;

impl ThirdPartyConsent for NoopThirdPartyConsent {
    fn is_available(&self) -> bool {
        false
    }

    fn update(&self, _signals: &ConsentSignals) {}
}

/// Keeps the latest signals for a host to read.
#[derive(Debug, Default)]
pub struct SharedConsentSignals {
    latest: Mutex<Option<ConsentSignals>>,
    updates: AtomicUsize,
}

impl SharedConsentSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<ConsentSignals> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl ThirdPartyConsent for SharedConsentSignals {
    fn update(&self, signals: &ConsentSignals) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(*signals);
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}
