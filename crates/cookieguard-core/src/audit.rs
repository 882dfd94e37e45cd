//! Server-side audit trail of consent decisions.
//!
//! Audit submissions are fire-and-forget: they never block or fail the local
//! consent flow, are never retried, and failures are only logged.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cookieguard_policy::{ConsentCategories, ConsentMethod, ConsentRecord};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ConsentConfig;
use crate::error::{ConsentError, ConsentResult};

/// Path the audit record is posted to when the endpoint has none.
pub const DEFAULT_AUDIT_PATH: &str = "/api/cookie-consent";

const USER_AGENT_VALUE: &str = concat!("cookieguard/", env!("CARGO_PKG_VERSION"));

/// Who gave consent, as far as the host knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Body of the audit POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub categories: ConsentCategories,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub consent_id: String,
    pub method: Option<ConsentMethod>,
}

impl AuditRecord {
    pub fn from_record(record: &ConsentRecord, client: &ClientContext) -> Self {
        Self {
            timestamp: record.timestamp,
            version: record.version.clone(),
            categories: record.categories,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            consent_id: record.consent_id.clone(),
            method: record.method,
        }
    }
}

/// Receiver of audit records.
pub trait AuditSink: Send + Sync {
    /// Hand off a record. Must not block and must not fail the caller.
    fn submit(&self, record: AuditRecord);
}

/// Discards audit records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn submit(&self, _record: AuditRecord) {}
}

/// Posts audit records as JSON to an HTTP endpoint.
#[derive(Debug)]
pub struct HttpAuditSink {
    client: reqwest::Client,
    endpoint: String,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl HttpAuditSink {
    /// `endpoint` without a path gets [`DEFAULT_AUDIT_PATH`].
    pub fn new(endpoint: &str, timeout: Duration) -> ConsentResult<Self> {
        let mut url = url::Url::parse(endpoint).map_err(|e| ConsentError::Config {
            message: format!("invalid audit endpoint {endpoint}: {e}"),
        })?;
        if url.path() == "/" || url.path().is_empty() {
            url.set_path(DEFAULT_AUDIT_PATH);
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| ConsentError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: url.to_string(),
            pending: Mutex::default(),
        })
    }

    /// Sink for the configured endpoint, or `None` if auditing is off.
    pub fn from_config(config: &ConsentConfig) -> ConsentResult<Option<Self>> {
        config
            .audit_endpoint
            .as_deref()
            .map(|endpoint| {
                Self::new(endpoint, Duration::from_secs(config.audit_timeout_secs))
            })
            .transpose()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one record and wait for the response.
    pub async fn send(&self, record: &AuditRecord) -> ConsentResult<()> {
        post(&self.client, &self.endpoint, record).await
    }

    /// Wait for every submitted record to finish sending.
    pub async fn drain(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "audit task aborted");
            }
        }
    }
}

impl AuditSink for HttpAuditSink {
    fn submit(&self, record: AuditRecord) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(consent_id = %record.consent_id, "no async runtime, audit record dropped");
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let handle = runtime.spawn(async move {
            if let Err(e) = post(&client, &endpoint, &record).await {
                warn!(
                    consent_id = %record.consent_id,
                    error = %e,
                    "failed to send consent audit record"
                );
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}

async fn post(client: &reqwest::Client, endpoint: &str, record: &AuditRecord) -> ConsentResult<()> {
    let response = client.post(endpoint).json(record).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ConsentError::Network {
            message: format!("HTTP {} from {}", status.as_u16(), endpoint),
        });
    }
    debug!(consent_id = %record.consent_id, "consent audit record sent");
    Ok(())
}
