//! Read-only snapshot of a monitor handed to one check run.

use serde::{Deserialize, Serialize};

use super::types::{Header, HttpMethod, PingRequest};
use crate::assertions::Assertion;
use crate::region::Region;
use crate::status::MonitorStatus;
use crate::DEFAULT_TIMEOUT_MS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSpec {
    pub id: String,

    #[serde(default)]
    pub workspace_id: String,

    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default)]
    pub headers: Vec<Header>,

    /// Only sent for methods that allow a body
    #[serde(default)]
    pub body: Option<String>,

    pub regions: Vec<Region>,

    /// Per-probe timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Latency in milliseconds above which a passing check is flagged degraded
    #[serde(default)]
    pub degraded_after: Option<u64>,

    #[serde(default)]
    pub assertions: Vec<Assertion>,

    /// Status stored before this run started
    #[serde(default)]
    pub status: MonitorStatus,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl MonitorSpec {
    pub fn new(id: impl Into<String>, url: impl Into<String>, regions: Vec<Region>) -> Self {
        Self {
            id: id.into(),
            workspace_id: String::new(),
            url: url.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
            regions,
            timeout: DEFAULT_TIMEOUT_MS,
            degraded_after: None,
            assertions: Vec::new(),
            status: MonitorStatus::Active,
        }
    }

    /// Build the wire request every region probes with
    pub fn ping_request(&self) -> PingRequest {
        PingRequest {
            url: self.url.clone(),
            method: self.method.as_str().to_string(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            timeout: Some(self.timeout),
        }
    }
}
