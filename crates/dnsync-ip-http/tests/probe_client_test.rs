// Tests for `ExternalProbeResolver` against a local echo service.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dnsync_core::config::ClientOptions;
use dnsync_core::traits::IpResolver;
use dnsync_core::Error;
use dnsync_ip_http::ExternalProbeResolver;

const TIMEOUT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(response: ResponseTemplate) -> (MockServer, ExternalProbeResolver) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(response)
        .expect(1)
        .mount(&server)
        .await;

    let resolver = ExternalProbeResolver::with_endpoints(
        vec![format!("{}/json", server.uri())],
        &ClientOptions::default(),
    )
    .unwrap();

    (server, resolver)
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_reads_ip_field() {
    let body = json!({ "ip": "203.0.113.77", "city": "Somewhere" });
    let (_server, resolver) = setup(ResponseTemplate::new(200).set_body_json(&body)).await;

    let address = resolver.resolve(TIMEOUT).await.unwrap();

    assert_eq!(address.ip, Ipv4Addr::new(203, 0, 113, 77));
    assert_eq!(address.strategy, "external-probe");
}

#[tokio::test]
async fn test_trims_whitespace() {
    let body = json!({ "ip": "  198.51.100.4\n" });
    let (_server, resolver) = setup(ResponseTemplate::new(200).set_body_json(&body)).await;

    let address = resolver.resolve(TIMEOUT).await.unwrap();

    assert_eq!(address.ip, Ipv4Addr::new(198, 51, 100, 4));
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_non_200_is_upstream_error() {
    let (_server, resolver) = setup(ResponseTemplate::new(503)).await;

    let err = resolver.resolve(TIMEOUT).await.unwrap_err();

    assert!(matches!(err, Error::Upstream { ref message, .. } if message.contains("503")));
}

#[tokio::test]
async fn test_malformed_body_is_upstream_error() {
    let (_server, resolver) =
        setup(ResponseTemplate::new(200).set_body_string("203.0.113.77")).await;

    let err = resolver.resolve(TIMEOUT).await.unwrap_err();

    assert!(err.is_upstream());
}

#[tokio::test]
async fn test_missing_ip_field_is_upstream_error() {
    let body = json!({ "address": "203.0.113.77" });
    let (_server, resolver) = setup(ResponseTemplate::new(200).set_body_json(&body)).await;

    assert!(resolver.resolve(TIMEOUT).await.unwrap_err().is_upstream());
}

#[tokio::test]
async fn test_ipv6_answer_is_rejected() {
    let body = json!({ "ip": "2001:db8::1" });
    let (_server, resolver) = setup(ResponseTemplate::new(200).set_body_json(&body)).await;

    assert!(resolver.resolve(TIMEOUT).await.unwrap_err().is_upstream());
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let body = json!({ "ip": "203.0.113.77" });
    let (_server, resolver) = setup(
        ResponseTemplate::new(200)
            .set_body_json(&body)
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let err = resolver
        .resolve(Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { .. }));
}
