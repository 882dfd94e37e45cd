//! End-to-end consent flows against in-memory and file-backed storage.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use cookieguard_core::{
    CategoryId, ConsentCategories, ConsentChange, ConsentConfig, ConsentError, ConsentManager,
    ConsentMethod, ConsentRecord, ConsentState, ConsentStorage, ConsentStore, Coverage,
    FileStorage, MemoryCookieJar, MemoryStorage, PolicyRegistry, SharedConsentSignals,
    SignalState, StorageError,
};
use tempfile::TempDir;

struct Harness {
    manager: ConsentManager,
    storage: Arc<MemoryStorage>,
    jar: Arc<MemoryCookieJar>,
    signals: Arc<SharedConsentSignals>,
}

fn registry() -> Arc<PolicyRegistry> {
    Arc::new(PolicyRegistry::reference().expect("reference catalog"))
}

fn harness_with(storage: Arc<MemoryStorage>) -> Harness {
    let jar = Arc::new(MemoryCookieJar::new());
    let signals = Arc::new(SharedConsentSignals::new());
    let manager = ConsentManager::builder(registry())
        .storage(storage.clone())
        .cookie_jar(jar.clone())
        .third_party(signals.clone())
        .build()
        .expect("build manager");
    Harness {
        manager,
        storage,
        jar,
        signals,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(MemoryStorage::new()))
}

fn set_tracking_cookies(jar: &MemoryCookieJar) {
    jar.set("_ga", "GA1.2.111", Some(".example.com"), "/");
    jar.set("_fbp", "fb.1.222", Some(".example.com"), "/");
    jar.set("__Host-session", "abc", None, "/");
}

#[test]
fn test_scenario_a_fresh_session_requires_consent() {
    let mut h = harness();

    assert_eq!(h.manager.mount(), ConsentState::NoConsent);
    assert!(h.manager.consent_required());

    let draft = h.manager.draft();
    assert!(draft.get(CategoryId::Essential));
    for id in [
        CategoryId::Analytics,
        CategoryId::Marketing,
        CategoryId::Functional,
        CategoryId::Personalization,
    ] {
        assert!(!draft.get(id), "{id} should start refused");
    }
}

#[test]
fn test_scenario_b_accept_all() {
    let mut h = harness();
    h.manager.mount();

    let record = h.manager.accept_all().unwrap();

    let stored = ConsentStore::new(h.storage.clone(), &ConsentConfig::default(), "2.0.0")
        .load()
        .unwrap();
    assert_eq!(stored, record);
    assert!(stored.categories.is_all_granted());
    assert_eq!(stored.method, Some(ConsentMethod::Banner));

    let registry = h.manager.registry();
    assert!(registry.is_cookie_allowed("_ga", &stored.categories));
    assert!(registry.is_cookie_allowed("_fbp", &stored.categories));
    assert!(h.manager.is_cookie_allowed("_ga"));
    assert!(!h.manager.consent_required());
    assert_eq!(
        h.manager.state(),
        ConsentState::ConsentGiven {
            coverage: Coverage::Full
        }
    );
    assert_eq!(
        h.signals.latest().unwrap().ad_storage,
        SignalState::Granted
    );
}

#[test]
fn test_scenario_c_reject_all_deletes_tracking_cookies() {
    let mut h = harness();
    h.manager.mount();
    set_tracking_cookies(&h.jar);

    let record = h.manager.reject_all().unwrap();

    assert!(record.categories.is_essential_only());
    assert!(!h.jar.contains("_ga"));
    assert!(!h.jar.contains("_fbp"));
    assert!(h.jar.contains("__Host-session"));
    assert!(!h.manager.is_cookie_allowed("_ga"));
    assert_eq!(
        h.signals.latest().unwrap().analytics_storage,
        SignalState::Denied
    );
}

#[test]
fn test_scenario_d_stale_version_asks_again() {
    let storage = Arc::new(MemoryStorage::new());
    let stale = ConsentRecord::new(
        "1.0.0",
        ConsentCategories::all_granted(),
        ConsentMethod::Banner,
    );
    storage
        .set("cookie-consent", &serde_json::to_string(&stale).unwrap())
        .unwrap();

    let mut h = harness_with(storage);
    set_tracking_cookies(&h.jar);

    assert_eq!(h.manager.mount(), ConsentState::NoConsent);
    assert!(h.manager.consent_required());
    assert!(h.manager.categories().is_essential_only());
    assert!(!h.manager.is_cookie_allowed("_ga"));
    assert!(!h.jar.contains("_ga"));
    assert!(!h.manager.store().is_valid(&stale));
}

#[test]
fn test_scenario_e_withdraw_after_accept() {
    let mut h = harness();
    h.manager.mount();
    h.manager.accept_all().unwrap();
    set_tracking_cookies(&h.jar);

    h.manager.withdraw();

    assert_eq!(h.manager.state(), ConsentState::Withdrawn);
    let registry = h.manager.registry();
    for category in registry.categories().iter().filter(|c| !c.essential) {
        for cookie in &category.cookies {
            assert!(
                !h.manager.is_cookie_allowed(&cookie.name),
                "{} still allowed",
                cookie.name
            );
        }
    }
    assert!(h.storage.get("cookie-consent").unwrap().is_none());
    assert!(!h.jar.contains("_ga"));
    assert!(h.jar.contains("__Host-session"));
}

#[test]
fn test_valid_record_is_restored_on_mount() {
    let storage = Arc::new(MemoryStorage::new());
    let mut first = harness_with(storage.clone());
    first.manager.mount();
    let record = first
        .manager
        .save_custom(ConsentCategories::granting([CategoryId::Analytics]))
        .unwrap();

    let mut second = harness_with(storage);
    assert_eq!(
        second.manager.mount(),
        ConsentState::ConsentGiven {
            coverage: Coverage::Partial
        }
    );
    assert_eq!(second.manager.current_record(), Some(&record));
    assert_eq!(second.manager.draft(), record.categories);
    assert!(!second.manager.consent_required());
}

#[test]
fn test_expired_record_is_ignored() {
    let storage = Arc::new(MemoryStorage::new());
    let mut old = ConsentRecord::new(
        "2.0.0",
        ConsentCategories::all_granted(),
        ConsentMethod::Banner,
    );
    old.timestamp = Utc::now() - Duration::days(400);
    storage
        .set("cookie-consent", &serde_json::to_string(&old).unwrap())
        .unwrap();

    let mut h = harness_with(storage);
    assert_eq!(h.manager.mount(), ConsentState::NoConsent);
}

#[test]
fn test_out_of_range_timestamp_mounts_without_consent() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set(
            "cookie-consent",
            r#"{"timestamp":"+262142-12-31T00:00:00Z","version":"2.0.0","categories":{"essential":true,"analytics":true},"consentId":"consent_1_abc","method":"banner"}"#,
        )
        .unwrap();

    let mut h = harness_with(storage);
    assert_eq!(h.manager.mount(), ConsentState::NoConsent);
    assert!(h.manager.consent_required());
    assert!(!h.manager.is_cookie_allowed("_ga"));
}

#[test]
fn test_save_failure_keeps_choice_for_session() {
    let storage = Arc::new(MemoryStorage::with_quota(16));
    let mut h = harness_with(storage);
    h.manager.mount();
    set_tracking_cookies(&h.jar);

    let changes: Arc<Mutex<Vec<ConsentChange>>> = Arc::default();
    let sink = changes.clone();
    h.manager.subscribe(move |change| {
        sink.lock().unwrap().push(change.clone());
        Ok(())
    });

    let err = h.manager.reject_all().unwrap_err();
    assert!(matches!(
        err,
        ConsentError::Storage(StorageError::QuotaExceeded { .. })
    ));
    assert!(h.manager.state().is_given());
    assert!(!h.jar.contains("_ga"));
    assert_eq!(changes.lock().unwrap().len(), 1);
    assert!(h.storage.is_empty());
}

#[test]
fn test_independent_instances_do_not_share_state() {
    let storage = Arc::new(MemoryStorage::new());
    let build = |key: &str| {
        ConsentManager::builder(registry())
            .config(ConsentConfig::default().with_storage_key(key))
            .storage(storage.clone())
            .build()
            .unwrap()
    };

    let mut site = build("site-consent");
    let mut portal = build("portal-consent");
    site.mount();
    portal.mount();

    site.accept_all().unwrap();
    assert!(portal.store().load().is_none());
    assert_eq!(portal.mount(), ConsentState::NoConsent);
    assert!(site.store().load().is_some());
}

#[test]
fn test_listener_receives_new_record() {
    let mut h = harness();
    h.manager.mount();

    let changes: Arc<Mutex<Vec<ConsentChange>>> = Arc::default();
    let sink = changes.clone();
    h.manager.subscribe(move |change| {
        sink.lock().unwrap().push(change.clone());
        Ok(())
    });

    let record = h.manager.accept_all().unwrap();
    h.manager.withdraw();

    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].record.as_ref(), Some(&record));
    assert!(changes[0].categories.is_all_granted());
    assert_eq!(changes[1].state, ConsentState::Withdrawn);
    assert!(changes[1].record.is_none());
}

#[test]
fn test_policy_version_override() {
    let mut manager = ConsentManager::builder(registry())
        .config(ConsentConfig::default().with_version("2.1.0"))
        .build()
        .unwrap();
    manager.mount();
    let record = manager.accept_all().unwrap();
    assert_eq!(record.version, "2.1.0");
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = ConsentManager::builder(registry())
        .config(ConsentConfig::default().with_storage_key(" "))
        .build();
    assert!(matches!(result, Err(ConsentError::Config { .. })));
}

#[test]
fn test_file_storage_roundtrip() {
    let temp = TempDir::new().unwrap();
    let storage: Arc<dyn ConsentStorage> = Arc::new(FileStorage::new(temp.path()));
    let store = ConsentStore::new(storage.clone(), &ConsentConfig::default(), "2.0.0");

    let record = ConsentRecord::new(
        "2.0.0",
        ConsentCategories::granting([CategoryId::Functional, CategoryId::Personalization]),
        ConsentMethod::Settings,
    );
    store.save(&record).unwrap();

    let reopened = ConsentStore::new(storage, &ConsentConfig::default(), "2.0.0");
    assert_eq!(reopened.load(), Some(record));

    std::fs::write(temp.path().join("cookie-consent.json"), "garbage").unwrap();
    assert_eq!(reopened.load(), None);
}

#[test]
fn test_file_backed_instances_with_similar_keys_stay_apart() {
    let temp = TempDir::new().unwrap();
    let storage: Arc<dyn ConsentStorage> = Arc::new(FileStorage::new(temp.path()));
    let build = |key: &str| {
        ConsentManager::builder(registry())
            .config(ConsentConfig::default().with_storage_key(key))
            .storage(storage.clone())
            .build()
            .unwrap()
    };

    let mut slashed = build("site/consent");
    slashed.mount();
    slashed.accept_all().unwrap();

    let mut spaced = build("site consent");
    assert_eq!(spaced.mount(), ConsentState::NoConsent);
    assert!(!spaced.is_cookie_allowed("_ga"));
}
