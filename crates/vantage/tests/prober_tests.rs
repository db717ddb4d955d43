//! Tests for the in-process region prober against a local target

mod common;

use std::time::Duration;

use common::{closed_port, Reply, TestServer};
use vantage::assertions::implicit_pass;
use vantage::{HttpMethod, PingRequest, ProbeErrorKind, Prober, ProberConfig, Region, RegionProber};

fn prober(region: Region) -> RegionProber {
    RegionProber::new(ProberConfig::builder().region(region).build()).unwrap()
}

#[tokio::test]
async fn test_get_never_sends_a_body() {
    let server = TestServer::start(|_| Reply::ok("hello")).await;

    let request = PingRequest::new(server.url("/health")).with_body("should not be sent");
    let result = prober(Region::Ams).probe(&request).await.unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.body.as_deref(), Some("hello"));

    let recorded = &server.requests()[0];
    assert_eq!(recorded.method, "GET");
    assert_eq!(recorded.path, "/health");
    assert!(recorded.body.is_empty());
    assert!(recorded.header("content-length").map_or(true, |len| len == "0"));
}

#[tokio::test]
async fn test_post_sends_body_as_json() {
    let server = TestServer::start(|_| Reply::status(201)).await;

    let request = PingRequest::new(server.url("/items"))
        .with_method(HttpMethod::Post)
        .with_body(r#"{"name":"probe"}"#);
    let result = prober(Region::Iad).probe(&request).await.unwrap();

    assert_eq!(result.status_code, 201);
    let recorded = &server.requests()[0];
    assert_eq!(recorded.body, br#"{"name":"probe"}"#);
    assert_eq!(recorded.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_identifying_headers_and_overrides() {
    let server = TestServer::start(|_| Reply::ok("")).await;
    let prober = prober(Region::Ams);

    prober.probe(&PingRequest::new(server.url("/")).with_header("X-Trace", "abc")).await.unwrap();
    prober
        .probe(&PingRequest::new(server.url("/")).with_header("user-agent", "custom/1.0").with_header("", "dropped"))
        .await
        .unwrap();

    let requests = server.requests();
    let first = &requests[0];
    assert_eq!(first.header("user-agent"), Some("OpenStatus/1.0"));
    assert_eq!(first.header("openstatus-ping"), Some("true"));
    assert_eq!(first.header("x-trace"), Some("abc"));

    let names = first.header_names();
    let position = |name: &str| names.iter().position(|n| n == name).unwrap();
    assert!(position("openstatus-ping") < position("x-trace"));

    let second = &requests[1];
    assert_eq!(second.header("user-agent"), Some("custom/1.0"));
    assert_eq!(second.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("user-agent")).count(), 1);
}

#[tokio::test]
async fn test_timing_phases_are_ordered() {
    let server = TestServer::start(|_| Reply::ok("x".repeat(4096)).with_delay(Duration::from_millis(50))).await;

    let result = prober(Region::Hkg).probe(&PingRequest::new(server.url("/"))).await.unwrap();
    let timing = result.timing;

    let phases = timing.phases().unwrap();
    assert_eq!(phases.tls, 0, "plain HTTP has a zero-width TLS phase");
    assert_eq!(timing.tls_handshake_start, timing.connect_done);
    assert!(timing.dns_done <= timing.connect_start);
    assert!(timing.connect_done <= timing.first_byte_start);
    assert!(timing.first_byte_done <= timing.transfer_done);
    assert!(phases.ttfb >= 40, "server delay shows up as ttfb, got {}", phases.ttfb);

    let widths = timing.phase_widths().unwrap();
    let sum: f64 = widths.iter().map(|(_, w)| w.width).sum();
    assert!((sum - 100.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_response_headers_are_captured() {
    let server = TestServer::start(|_| Reply::ok("{}").with_header("X-Served-By", "edge-7")).await;

    let result = prober(Region::Syd).probe(&PingRequest::new(server.url("/"))).await.unwrap();
    assert_eq!(result.header("x-served-by"), Some("edge-7"));
    assert_eq!(result.region, Region::Syd);
    assert!(result.timestamp > 0);
}

#[tokio::test]
async fn test_redirect_is_followed_and_flagged() {
    let server = TestServer::start(|request| match request.path.as_str() {
        "/old" => Reply::redirect(301, "/new"),
        _ => Reply::ok("moved here"),
    })
    .await;

    let request = PingRequest::new(server.url("/old")).with_method(HttpMethod::Post).with_body("{}");
    let result = prober(Region::Ams).probe(&request).await.unwrap();

    assert_eq!(result.status_code, 200);
    assert!(result.redirected);
    assert!(!implicit_pass(&result));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, "GET", "301 turns POST into GET");
    assert!(requests[1].body.is_empty());
}

#[tokio::test]
async fn test_redirect_loop_stops() {
    let server = TestServer::start(|_| Reply::redirect(302, "/again")).await;

    let result = prober(Region::Ams).probe(&PingRequest::new(server.url("/"))).await.unwrap();
    assert_eq!(result.status_code, 302);
    assert!(result.redirected);
    assert_eq!(server.requests().len(), vantage::handlers::http::MAX_REDIRECTS + 1);
}

#[tokio::test]
async fn test_timeout_is_a_typed_error() {
    let server = TestServer::start(|_| Reply::ok("late").with_delay(Duration::from_secs(3))).await;

    let request = PingRequest::new(server.url("/")).with_timeout(200);
    let error = prober(Region::Gru).probe(&request).await.unwrap_err();

    assert_eq!(error.kind, ProbeErrorKind::Timeout);
    assert_eq!(error.region, Region::Gru);
    assert!(error.latency >= 200 && error.latency < 1_000, "latency was {}", error.latency);
}

#[tokio::test]
async fn test_connection_refused_is_a_network_error() {
    let addr = closed_port().await;

    let error = prober(Region::Jnb).probe(&PingRequest::new(format!("http://{addr}/"))).await.unwrap_err();
    assert_eq!(error.kind, ProbeErrorKind::Network);
}

#[tokio::test]
async fn test_unresolvable_host_is_a_dns_failure() {
    let request = PingRequest::new("http://vantage-probe.invalid/").with_timeout(10_000);
    let error = prober(Region::Ams).probe(&request).await.unwrap_err();
    assert_eq!(error.kind, ProbeErrorKind::DnsFailure);
}

#[tokio::test]
async fn test_invalid_request_never_hits_the_network() {
    let server = TestServer::start(|_| Reply::ok("")).await;
    let prober = prober(Region::Ams);

    let mut request = PingRequest::new(server.url("/"));
    request.method = "PATCH".to_string();
    assert_eq!(prober.probe(&request).await.unwrap_err().kind, ProbeErrorKind::InvalidRequest);

    let request = PingRequest::new("ftp://example.com/file");
    assert_eq!(prober.probe(&request).await.unwrap_err().kind, ProbeErrorKind::InvalidRequest);

    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_body_is_truncated() {
    let server = TestServer::start(|_| Reply::ok("a".repeat(100))).await;
    let prober = RegionProber::new(ProberConfig::builder().max_body_bytes(10).build()).unwrap();

    let result = prober.probe(&PingRequest::new(server.url("/"))).await.unwrap();
    assert_eq!(result.body.as_deref(), Some("aaaaaaaaaa"));
}

#[tokio::test]
async fn test_head_has_no_body() {
    let server = TestServer::start(|_| Reply::ok("ignored")).await;

    let request = PingRequest::new(server.url("/")).with_method(HttpMethod::Head).with_body("nope");
    let result = prober(Region::Ams).probe(&request).await.unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.body, None);
    assert!(server.requests()[0].body.is_empty());
}
