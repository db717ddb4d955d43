//! TCP connect checks.
//!
//! The check resolves the target and opens a connection; nothing is written
//! to it. The measured span covers resolution and connect.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::http::{connect, resolve, TransportError};
use super::response::{build_probe_error, build_timeout_error};
use super::validation::{parse_tcp_target, validate_tcp_request};
use crate::protocol::{ProbeError, TcpRequest, TcpResponse, TcpTiming};
use crate::region::Region;
use crate::timing::now_ms;

/// Handle a TCP check from the vantage point of `region`
pub async fn handle_tcp_request(
    region: Region,
    request: &TcpRequest,
    default_timeout: Duration,
) -> Result<TcpResponse, ProbeError> {
    info!("Handling tcp request: {}", request.url);

    if let Err(error) = validate_tcp_request(request) {
        return Err(ProbeError::invalid_request(region, error.to_string()));
    }

    let timeout = request.timeout.map(Duration::from_millis).unwrap_or(default_timeout);
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, ping_tcp(request)).await;
    let latency = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(timing)) => Ok(TcpResponse { region, timestamp: timing.tcp_start, latency, timing }),
        Ok(Err(error)) => Err(build_probe_error(region, error, latency)),
        Err(_) => Err(build_timeout_error(region, timeout, latency)),
    }
}

/// Resolve and connect once, without a timeout of its own
pub async fn ping_tcp(request: &TcpRequest) -> Result<TcpTiming, TransportError> {
    let (host, port) =
        parse_tcp_target(&request.url).map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    let tcp_start = now_ms();
    let addrs = resolve(&host, port).await?;
    let stream = connect(&addrs).await?;
    let tcp_done = now_ms();

    debug!(peer = ?stream.peer_addr().ok(), "TCP connection established");
    drop(stream);

    Ok(TcpTiming { tcp_start, tcp_done })
}
