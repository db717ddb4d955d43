//! Protocol type definitions for Vantage.
//!
//! This module defines the data structures exchanged with regional
//! checkers and the immutable result of one probe.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ProbeError;
use crate::region::Region;
use crate::timing::Timing;

/// HTTP methods a monitor may use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// GET and HEAD requests never carry a body
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            _ => Err(anyhow::anyhow!("Unsupported HTTP method: {}", s)),
        }
    }
}

/// A user supplied request header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// A probe request sent to a regional checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRequest {
    /// The URL to probe
    pub url: String,

    /// The HTTP method to use (GET, POST, etc.)
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers in the order they were configured
    #[serde(default)]
    pub headers: Vec<Header>,

    /// Optional request body, ignored for GET and HEAD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_method() -> String {
    HttpMethod::Get.as_str().to_string()
}

impl PingRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method.as_str().to_string();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(key, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }
}

/// A probe result as returned by a regional checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    /// HTTP status code
    pub status: u16,

    /// Wall-clock duration of the request in milliseconds
    pub latency: u64,

    /// Response headers
    pub headers: BTreeMap<String, String>,

    /// Timestamp when the probe started (unix ms)
    pub time: i64,

    pub timing: Timing,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Whether at least one redirect was followed
    #[serde(default)]
    pub redirected: bool,
}

/// The outcome of one successful probe in one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub region: Region,
    pub status_code: u16,
    /// Wall-clock duration of the whole request in milliseconds
    pub latency: u64,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub timing: Timing,
    /// Unix ms at which the probe started
    pub timestamp: i64,
    pub redirected: bool,
}

impl CheckResult {
    pub fn from_response(region: Region, response: PingResponse) -> Self {
        Self {
            region,
            status_code: response.status,
            latency: response.latency,
            headers: response.headers,
            body: response.body,
            timing: response.timing,
            timestamp: response.time,
            redirected: response.redirected,
        }
    }

    pub fn to_response(&self) -> PingResponse {
        PingResponse {
            status: self.status_code,
            latency: self.latency,
            headers: self.headers.clone(),
            time: self.timestamp,
            timing: self.timing,
            body: self.body.clone(),
            redirected: self.redirected,
        }
    }

    /// Whether the final response status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Look up a response header, ignoring ASCII case
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Drop the response body, used before caching results
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }
}

/// Outcome of probing one region: a result or a typed failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ProbeOutcome {
    Success(CheckResult),
    Failure(ProbeError),
}

impl ProbeOutcome {
    pub fn region(&self) -> Region {
        match self {
            ProbeOutcome::Success(result) => result.region,
            ProbeOutcome::Failure(error) => error.region,
        }
    }

    pub fn latency(&self) -> u64 {
        match self {
            ProbeOutcome::Success(result) => result.latency,
            ProbeOutcome::Failure(error) => error.latency,
        }
    }

    pub fn as_result(&self) -> Result<&CheckResult, &ProbeError> {
        match self {
            ProbeOutcome::Success(result) => Ok(result),
            ProbeOutcome::Failure(error) => Err(error),
        }
    }

    pub fn into_result(self) -> Result<CheckResult, ProbeError> {
        match self {
            ProbeOutcome::Success(result) => Ok(result),
            ProbeOutcome::Failure(error) => Err(error),
        }
    }
}

impl From<Result<CheckResult, ProbeError>> for ProbeOutcome {
    fn from(result: Result<CheckResult, ProbeError>) -> Self {
        match result {
            Ok(result) => ProbeOutcome::Success(result),
            Err(error) => ProbeOutcome::Failure(error),
        }
    }
}
