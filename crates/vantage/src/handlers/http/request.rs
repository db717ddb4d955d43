//! HTTP probe request handling implementation.

use std::time::{Duration, Instant};

use hyper::Method;
use tracing::{debug, info};
use url::Url;

use super::headers::request_headers;
use super::transport::{Transport, TransportError};
use crate::handlers::response::{build_check_result, build_probe_error, build_timeout_error};
use crate::handlers::validation::validate_ping_request;
use crate::protocol::{CheckResult, HttpMethod, PingRequest, PingResponse, ProbeError};
use crate::region::Region;
use crate::timing::now_ms;

/// Redirect hops followed before the last 3xx is reported as is
pub const MAX_REDIRECTS: usize = 10;

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
        }
    }
}

/// Handle a ping request from the vantage point of `region`.
///
/// The whole exchange, redirects included, is bounded by the request timeout
/// or `default_timeout` when the request has none.
pub async fn handle_ping_request(
    transport: &Transport,
    region: Region,
    request: &PingRequest,
    default_timeout: Duration,
) -> Result<CheckResult, ProbeError> {
    info!("Handling ping request: {} {}", request.method, request.url);

    if let Err(error) = validate_ping_request(request) {
        return Err(ProbeError::invalid_request(region, error.to_string()));
    }

    let timeout = request.timeout.map(Duration::from_millis).unwrap_or(default_timeout);

    // Record start time
    let start = Instant::now();

    let result = tokio::time::timeout(timeout, perform_http_request(transport, request)).await;

    // Calculate duration
    let latency = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(response)) => Ok(build_check_result(region, response)),
        Ok(Err(error)) => Err(build_probe_error(region, error, latency)),
        Err(_) => Err(build_timeout_error(region, timeout, latency)),
    }
}

/// Perform the actual HTTP request, following redirects.
///
/// The reported timing is the final hop's; `latency` spans every hop.
pub async fn perform_http_request(
    transport: &Transport,
    request: &PingRequest,
) -> Result<PingResponse, TransportError> {
    let mut method: HttpMethod =
        request.method.parse().map_err(|e: anyhow::Error| TransportError::InvalidRequest(e.to_string()))?;
    let mut url = Url::parse(&request.url).map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    let time = now_ms();
    let start = Instant::now();
    let mut redirects = 0;

    loop {
        let headers = request_headers(request, method);
        let body = if method.allows_body() { request.body.as_deref() } else { None };

        let exchange = transport.send(&method.into(), &url, &headers, body).await?;

        let next = match &exchange.location {
            Some(location) if is_redirect(exchange.status) && redirects < MAX_REDIRECTS => {
                url.join(location).ok().filter(|next| matches!(next.scheme(), "http" | "https"))
            }
            _ => None,
        };

        let Some(next) = next else {
            return Ok(PingResponse {
                status: exchange.status,
                latency: start.elapsed().as_millis() as u64,
                headers: exchange.headers,
                time,
                timing: exchange.timing,
                body: exchange.body,
                redirected: redirects > 0,
            });
        };

        debug!(from = %url, to = %next, status = exchange.status, "Following redirect");

        // 301/302/303 turn into a bodiless GET, 307/308 replay the request
        if matches!(exchange.status, 301 | 302 | 303) && method != HttpMethod::Head {
            method = HttpMethod::Get;
        }
        url = next;
        redirects += 1;
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}
