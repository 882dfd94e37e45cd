//! Make cookie and third-party script state match a consent decision.

mod jar;
mod signals;

use std::fmt;
use std::sync::Arc;

use cookieguard_policy::{CategoryId, ConsentCategories, CookieDefinition, PolicyRegistry};
use serde::Serialize;
use tracing::debug;

pub use jar::{CookieDeletion, CookieJar, HeaderCookieJar, MemoryCookieJar, StoredCookie, EXPIRED};
pub use signals::{
    ConsentSignals, NoopThirdPartyConsent, SharedConsentSignals, SignalState, ThirdPartyConsent,
};

/// What one `enforce` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnforcementReport {
    /// Optional categories without consent.
    pub blocked: Vec<CategoryId>,
    /// Deletions issued to the jar.
    pub deletions: Vec<CookieDeletion>,
}

/// Applies consent decisions to a cookie jar and third-party scripts.
#[derive(Clone)]
pub struct ConsentEnforcer {
    registry: Arc<PolicyRegistry>,
    jar: Arc<dyn CookieJar>,
    third_party: Arc<dyn ThirdPartyConsent>,
}

impl fmt::Debug for ConsentEnforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentEnforcer")
            .field("policy_version", &self.registry.version())
            .finish_non_exhaustive()
    }
}

impl ConsentEnforcer {
    pub fn new(
        registry: Arc<PolicyRegistry>,
        jar: Arc<dyn CookieJar>,
        third_party: Arc<dyn ThirdPartyConsent>,
    ) -> Self {
        Self {
            registry,
            jar,
            third_party,
        }
    }

    /// Delete every cookie of every optional category without consent.
    ///
    /// Essential categories are never touched. Running it again with the
    /// same input leaves the jar unchanged.
    pub fn enforce(&self, categories: &ConsentCategories) -> EnforcementReport {
        let mut report = EnforcementReport::default();

        for category in self.registry.categories() {
            if category.essential || categories.get(category.id) {
                continue;
            }
            report.blocked.push(category.id);

            for cookie in &category.cookies {
                for deletion in deletions_for(cookie) {
                    self.jar.delete(&deletion);
                    report.deletions.push(deletion);
                }
            }
        }

        debug!(
            blocked = ?report.blocked,
            deletions = report.deletions.len(),
            "enforced cookie consent"
        );
        report
    }

    /// Push consent signals to third-party scripts, if any are present.
    pub fn configure_third_party_consent(&self, categories: &ConsentCategories) {
        if !self.third_party.is_available() {
            debug!("no third-party consent receiver, skipping signals");
            return;
        }
        let signals = ConsentSignals::from_categories(categories);
        self.third_party.update(&signals);
        debug!(?signals, "updated third-party consent signals");
    }
}

/// Declared scope, then host-only, then dot-prefixed domain. Duplicates are
/// dropped.
fn deletions_for(cookie: &CookieDefinition) -> Vec<CookieDeletion> {
    let scoped = |domain: Option<String>| CookieDeletion {
        name: cookie.name.clone(),
        domain,
        path: cookie.path.clone(),
    };

    let mut deletions = vec![scoped(cookie.domain.clone()), scoped(None)];
    if let Some(domain) = &cookie.domain {
        deletions.push(scoped(Some(format!(".{}", domain.trim_start_matches('.')))));
    }

    let mut unique: Vec<CookieDeletion> = Vec::with_capacity(deletions.len());
    for deletion in deletions {
        if !unique.contains(&deletion) {
            unique.push(deletion);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ConsentEnforcer, Arc<MemoryCookieJar>, Arc<SharedConsentSignals>) {
        let registry = Arc::new(PolicyRegistry::reference().unwrap());
        let jar = Arc::new(MemoryCookieJar::new());
        let signals = Arc::new(SharedConsentSignals::new());
        let enforcer = ConsentEnforcer::new(registry, jar.clone(), signals.clone());
        (enforcer, jar, signals)
    }

    fn seed(jar: &MemoryCookieJar) {
        jar.set("cookie-consent", "{}", Some(".example.com"), "/");
        jar.set("__Host-session", "s1", None, "/");
        jar.set("_ga", "GA1.2.3", Some(".example.com"), "/");
        jar.set("_gid", "GA1.2.4", None, "/");
        jar.set("_fbp", "fb.1", None, "/");
        jar.set("lang", "nl", Some(".example.com"), "/");
        jar.set("unlisted", "x", None, "/");
    }

    #[test]
    fn test_reject_deletes_optional_cookies_in_every_scope() {
        let (enforcer, jar, _) = setup();
        seed(&jar);

        let report = enforcer.enforce(&ConsentCategories::essential_only());

        assert_eq!(
            report.blocked,
            vec![
                CategoryId::Functional,
                CategoryId::Analytics,
                CategoryId::Marketing,
                CategoryId::Personalization
            ]
        );
        assert_eq!(
            jar.names(),
            vec!["__Host-session", "cookie-consent", "unlisted"]
        );
    }

    #[test]
    fn test_granted_categories_are_kept() {
        let (enforcer, jar, _) = setup();
        seed(&jar);

        enforcer.enforce(&ConsentCategories::granting([CategoryId::Analytics]));

        assert!(jar.contains("_ga"));
        assert!(jar.contains("_gid"));
        assert!(!jar.contains("_fbp"));
        assert!(!jar.contains("lang"));
    }

    #[test]
    fn test_enforce_is_idempotent() {
        let (enforcer, jar, _) = setup();
        seed(&jar);
        let consent = ConsentCategories::granting([CategoryId::Functional]);

        let first = enforcer.enforce(&consent);
        let after_first = jar.snapshot();
        let second = enforcer.enforce(&consent);

        assert_eq!(jar.snapshot(), after_first);
        assert_eq!(first, second);
    }

    #[test]
    fn test_deletion_scopes() {
        let registry = PolicyRegistry::reference().unwrap();
        let ga = registry.cookie("_ga").unwrap();
        let domains: Vec<_> = deletions_for(ga).into_iter().map(|d| d.domain).collect();
        assert_eq!(domains, vec![Some(".example.com".to_string()), None]);

        let mut bare = ga.clone();
        bare.domain = Some("example.com".into());
        let domains: Vec<_> = deletions_for(&bare).into_iter().map(|d| d.domain).collect();
        assert_eq!(
            domains,
            vec![
                Some("example.com".to_string()),
                None,
                Some(".example.com".to_string())
            ]
        );

        bare.domain = None;
        assert_eq!(deletions_for(&bare).len(), 1);
    }

    #[test]
    fn test_third_party_signals() {
        let (enforcer, _, signals) = setup();
        enforcer.configure_third_party_consent(&ConsentCategories::all_granted());
        assert_eq!(
            signals.latest().unwrap().analytics_storage,
            SignalState::Granted
        );

        enforcer.configure_third_party_consent(&ConsentCategories::essential_only());
        assert_eq!(signals.latest(), Some(ConsentSignals::denied()));
        assert_eq!(signals.update_count(), 2);
    }

    #[test]
    fn test_missing_third_party_is_noop() {
        let registry = Arc::new(PolicyRegistry::reference().unwrap());
        let enforcer = ConsentEnforcer::new(
            registry,
            Arc::new(MemoryCookieJar::new()),
            Arc::new(NoopThirdPartyConsent),
        );
        enforcer.configure_third_party_consent(&ConsentCategories::all_granted());
    }
}
