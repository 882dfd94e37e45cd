//! Consent identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate an identifier for a new consent record.
///
/// Format: `consent_<unix millis>_<random><sequence>`. The per-process
/// sequence keeps ids distinct even when two are minted in the same
/// millisecond. Not a cryptographic identifier.
pub fn generate_consent_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("consent_{millis}_{suffix}{sequence:x}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_consent_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_id_shape() {
        let id = generate_consent_id();
        let mut parts = id.splitn(3, '_');
        assert_eq!(parts.next(), Some("consent"));
        assert!(parts.next().unwrap().parse::<i64>().is_ok());
        let tail = parts.next().unwrap();
        assert!(tail.len() >= 10);
        assert!(tail.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_uppercase()));
    }
}
