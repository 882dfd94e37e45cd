//! Audit submission against a mock consent endpoint.

use std::sync::Arc;
use std::time::Duration;

use cookieguard_core::{
    AuditRecord, ClientContext, ConsentCategories, ConsentConfig, ConsentError, ConsentManager,
    ConsentMethod, ConsentRecord, HttpAuditSink, PolicyRegistry,
};
use serde_json::Value;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_record() -> ConsentRecord {
    ConsentRecord::new(
        "2.0.0",
        ConsentCategories::essential_only(),
        ConsentMethod::Banner,
    )
}

#[tokio::test]
async fn test_send_posts_camel_case_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/cookie-consent"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "version": "2.0.0",
            "method": "banner",
            "ipAddress": "198.51.100.4",
            "categories": {"essential": true, "analytics": false}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = HttpAuditSink::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
    let client = ClientContext {
        ip_address: Some("198.51.100.4".into()),
        user_agent: None,
    };
    sink.send(&AuditRecord::from_record(&sample_record(), &client))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_server_error_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/cookie-consent"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let sink = HttpAuditSink::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
    let err = sink
        .send(&AuditRecord::from_record(
            &sample_record(),
            &ClientContext::default(),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, ConsentError::Network { .. }));
    assert_eq!(err.exit_code(), 5);
}

#[tokio::test]
async fn test_manager_submits_audit_and_ignores_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/cookie-consent"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = ConsentConfig::default().with_audit_endpoint(mock_server.uri());
    let sink = Arc::new(HttpAuditSink::from_config(&config).unwrap().unwrap());
    let registry = Arc::new(PolicyRegistry::reference().unwrap());
    let mut manager = ConsentManager::builder(registry)
        .config(config)
        .audit_sink(sink.clone())
        .build()
        .unwrap();
    manager.mount();

    manager.accept_all().unwrap();
    manager.reject_all().unwrap();
    sink.drain().await;

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    let first: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(first["categories"]["marketing"], true);
    assert!(first["consentId"].as_str().unwrap().starts_with("consent_"));
    let user_agent = received[0].headers.get("user-agent").unwrap();
    assert!(user_agent.to_str().unwrap().starts_with("cookieguard/"));
}

#[tokio::test]
async fn test_withdraw_is_not_audited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = Arc::new(HttpAuditSink::new(&mock_server.uri(), Duration::from_secs(5)).unwrap());
    let registry = Arc::new(PolicyRegistry::reference().unwrap());
    let mut manager = ConsentManager::builder(registry)
        .audit_sink(sink.clone())
        .build()
        .unwrap();
    manager.mount();

    manager.accept_all().unwrap();
    manager.withdraw();
    sink.drain().await;
}
