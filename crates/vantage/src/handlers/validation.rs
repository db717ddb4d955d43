//! Request validation for Vantage handlers.
//!
//! A request failing validation is a configuration-level error: it is fatal
//! for the probe of one region and never reaches the network.

use anyhow::Result;
use hyper::header::{HeaderName, HeaderValue};
use url::{Host, Url};

use crate::protocol::{Header, HttpMethod, PingRequest, TcpRequest};

pub const MIN_TIMEOUT_MS: u64 = 100;
pub const MAX_TIMEOUT_MS: u64 = 300_000; // 5 minutes
pub const MAX_HEADERS: usize = 20;
pub const MAX_HEADER_SIZE: usize = 8192;
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1MB

/// Validate a ping request
pub fn validate_ping_request(request: &PingRequest) -> Result<()> {
    // Validate URL
    validate_url(&request.url)?;

    // Validate HTTP method
    request.method.parse::<HttpMethod>()?;

    // Validate timeout
    if let Some(timeout) = request.timeout {
        validate_timeout(timeout)?;
    }

    // Validate headers
    validate_headers(&request.headers)?;

    // Validate body size
    if let Some(body) = &request.body {
        validate_body_size(body)?;
    }

    Ok(())
}

/// Validate a TCP check request
pub fn validate_tcp_request(request: &TcpRequest) -> Result<()> {
    parse_tcp_target(&request.url)?;

    if let Some(timeout) = request.timeout {
        validate_timeout(timeout)?;
    }

    Ok(())
}

/// Split a `host:port` target, with or without a `tcp://` prefix
pub fn parse_tcp_target(target: &str) -> Result<(String, u16)> {
    let target = target.trim();
    let target = target.strip_prefix("tcp://").unwrap_or(target);
    let parsed = Url::parse(&format!("tcp://{target}"))?;

    let port = parsed
        .port()
        .ok_or_else(|| anyhow::anyhow!("TCP target must carry a port: {}", target))?;
    let host = match parsed.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        _ => return Err(anyhow::anyhow!("TCP target must have a valid host: {}", target)),
    };

    Ok((host, port))
}

/// Validate URL format and scheme
fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url)?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(anyhow::anyhow!("Unsupported URL scheme: {}", parsed.scheme())),
    }

    if parsed.host_str().is_none() {
        return Err(anyhow::anyhow!("URL must have a valid host: {}", url));
    }

    Ok(())
}

/// Validate timeout value
fn validate_timeout(timeout: u64) -> Result<()> {
    if timeout < MIN_TIMEOUT_MS {
        return Err(anyhow::anyhow!("Timeout too small: {} ms (min: {} ms)", timeout, MIN_TIMEOUT_MS));
    }

    if timeout > MAX_TIMEOUT_MS {
        return Err(anyhow::anyhow!("Timeout too large: {} ms (max: {} ms)", timeout, MAX_TIMEOUT_MS));
    }

    Ok(())
}

/// Validate headers; entries with an empty key are dropped before sending and
/// are not counted
fn validate_headers(headers: &[Header]) -> Result<()> {
    let headers: Vec<&Header> = headers.iter().filter(|h| !h.key.trim().is_empty()).collect();

    if headers.len() > MAX_HEADERS {
        return Err(anyhow::anyhow!("Too many headers: {} (max: {})", headers.len(), MAX_HEADERS));
    }

    for header in headers {
        let size = header.key.len() + header.value.len();
        if size > MAX_HEADER_SIZE {
            return Err(anyhow::anyhow!(
                "Header too large: {} bytes (max: {} bytes)",
                size,
                MAX_HEADER_SIZE
            ));
        }

        HeaderName::from_bytes(header.key.trim().as_bytes())
            .map_err(|_| anyhow::anyhow!("Invalid header name: {:?}", header.key))?;
        HeaderValue::from_str(&header.value)
            .map_err(|_| anyhow::anyhow!("Invalid value for header {:?}", header.key))?;
    }

    Ok(())
}

/// Validate body size
fn validate_body_size(body: &str) -> Result<()> {
    if body.len() > MAX_REQUEST_BODY_SIZE {
        return Err(anyhow::anyhow!(
            "Body too large: {} bytes (max: {} bytes)",
            body.len(),
            MAX_REQUEST_BODY_SIZE
        ));
    }

    Ok(())
}
