//! Response utilities for Vantage handlers.
//!
//! This module maps the outcome of an HTTP exchange onto check results and
//! typed probe errors.

use std::time::Duration;

use super::http::TransportError;
use crate::protocol::{CheckResult, ErrorBody, PingResponse, ProbeError};
use crate::region::Region;

/// Build a check result from a completed exchange
pub fn build_check_result(region: Region, response: PingResponse) -> CheckResult {
    CheckResult::from_response(region, response)
}

/// Build a probe error from a transport failure
pub fn build_probe_error(region: Region, error: TransportError, latency: u64) -> ProbeError {
    ProbeError::new(region, error.kind(), error.to_string()).with_latency(latency)
}

/// Build a timeout probe error carrying the measured wall-clock latency
pub fn build_timeout_error(region: Region, timeout: Duration, latency: u64) -> ProbeError {
    ProbeError::timeout(region, timeout.as_millis() as u64).with_latency(latency)
}

/// Wrap a probe error into the body a checker answers with
pub fn build_error_body(error: ProbeError) -> ErrorBody {
    ErrorBody { error }
}
