// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connector behaviour against a mock Tally HTTP endpoint.

use std::time::Duration;

use tallylink_config::model::TallyConfig;
use tallylink_core::{AgentError, TargetConnector};
use tallylink_tally::{TallyClient, TallyConnector};
use wiremock::matchers::{body_string_contains, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector_for(server: &MockServer) -> TallyConnector {
    let config = TallyConfig {
        liveness_timeout_ms: 500,
        request_timeout_secs: 2,
        ..TallyConfig::default()
    };
    TallyConnector::with_client(TallyClient::new(&config).unwrap().with_base_url(server.uri()))
}

/// A port that nothing listens on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn any_http_response_means_available() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(connector_for(&server).is_available().await);
}

#[tokio::test]
async fn refused_connection_is_target_unavailable() {
    let config = TallyConfig::default();
    let connector = TallyConnector::with_client(
        TallyClient::new(&config).unwrap().with_base_url(closed_port_url()),
    );

    assert!(!connector.is_available().await);
    let err = connector.send("<ENVELOPE/>").await.unwrap_err();
    assert!(
        matches!(err, AgentError::TargetUnavailable(_)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn send_posts_xml_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("content-type", "text/xml; charset=utf-8"))
        .and(body_string_contains("<ID>List of Ledgers</ID>"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE/>"))
        .expect(1)
        .mount(&server)
        .await;

    let body = connector_for(&server)
        .send(&tallylink_tally::builder::ledger_list().unwrap())
        .await
        .unwrap();
    assert_eq!(body, "<ENVELOPE/>");
}

#[tokio::test]
async fn error_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = connector_for(&server).send("<ENVELOPE/>").await.unwrap_err();
    assert!(matches!(err, AgentError::Transport { .. }), "got {err:?}");
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn slow_tally_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = connector_for(&server).send("<ENVELOPE/>").await.unwrap_err();
    assert!(matches!(err, AgentError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn edition_cached_after_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<ID>SysInfo</ID>"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE>TallyPrime 5.0</ENVELOPE>"))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server);
    assert_eq!(connector.edition().await.as_deref(), Some("Prime"));
    assert_eq!(connector.edition().await.as_deref(), Some("Prime"));
}

#[tokio::test]
async fn failed_company_lookup_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<ID>CompanyInfo</ID>"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("<ID>CompanyInfo</ID>"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<ENVELOPE><COMPANY NAME="Acme Traders"/></ENVELOPE>"#),
        )
        .mount(&server)
        .await;

    let connector = connector_for(&server);
    assert_eq!(connector.company_name().await, None);
    assert_eq!(
        connector.company_name().await.as_deref(),
        Some("Acme Traders")
    );
}
