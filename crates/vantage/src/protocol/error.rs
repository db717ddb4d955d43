//! Typed per-region probe failures.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::region::Region;

/// Classification of a failed probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeErrorKind {
    /// The request exceeded its timeout
    Timeout,
    /// Connection refused, reset or otherwise broken
    Network,
    /// The target host could not be resolved
    DnsFailure,
    /// The TLS handshake failed
    TlsFailure,
    /// A regional checker answered with something that is not a probe result
    SchemaViolation,
    /// The probe could not be issued as specified (bad url, method, limits)
    InvalidRequest,
}

impl ProbeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeErrorKind::Timeout => "timeout",
            ProbeErrorKind::Network => "network",
            ProbeErrorKind::DnsFailure => "dns-failure",
            ProbeErrorKind::TlsFailure => "tls-failure",
            ProbeErrorKind::SchemaViolation => "schema-violation",
            ProbeErrorKind::InvalidRequest => "invalid-request",
        }
    }

    /// Whether a retry has any chance of producing a different outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProbeErrorKind::Network | ProbeErrorKind::DnsFailure | ProbeErrorKind::TlsFailure)
    }
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A probe that did not produce a check result in one region
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{kind} in {region}: {message}")]
pub struct ProbeError {
    pub region: Region,
    pub kind: ProbeErrorKind,
    pub message: String,
    /// Wall-clock time spent before the failure, in milliseconds
    #[serde(default)]
    pub latency: u64,
}

impl ProbeError {
    pub fn new(region: Region, kind: ProbeErrorKind, message: impl Into<String>) -> Self {
        Self { region, kind, message: message.into(), latency: 0 }
    }

    pub fn with_latency(mut self, latency: u64) -> Self {
        self.latency = latency;
        self
    }

    pub fn timeout(region: Region, timeout_ms: u64) -> Self {
        Self::new(region, ProbeErrorKind::Timeout, format!("Timeout after {timeout_ms} ms"))
            .with_latency(timeout_ms)
    }

    pub fn invalid_request(region: Region, message: impl Into<String>) -> Self {
        Self::new(region, ProbeErrorKind::InvalidRequest, message)
    }

    pub fn schema_violation(region: Region, message: impl Into<String>) -> Self {
        Self::new(region, ProbeErrorKind::SchemaViolation, message)
    }
}

/// Body returned by a checker when the probe failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ProbeError,
}
