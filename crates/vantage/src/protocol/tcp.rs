//! Wire types of a TCP connect check.

use serde::{Deserialize, Serialize};

use crate::region::Region;

/// Open a TCP connection to `url` (`host:port`) and measure how long it took
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpRequest {
    /// Target as `host:port`, an optional `tcp://` prefix is accepted
    pub url: String,

    /// Timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl TcpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), timeout: None }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }
}

/// Unix ms around resolving and connecting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpTiming {
    pub tcp_start: i64,
    pub tcp_done: i64,
}

impl TcpTiming {
    pub fn duration(&self) -> i64 {
        (self.tcp_done - self.tcp_start).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpResponse {
    pub region: Region,
    /// Unix ms at which the check started
    pub timestamp: i64,
    /// Wall-clock duration in milliseconds
    pub latency: u64,
    pub timing: TcpTiming,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request: TcpRequest = serde_json::from_str(r#"{"url":"db.example.com:5432"}"#).unwrap();
        assert_eq!(request, TcpRequest::new("db.example.com:5432"));

        let timing = TcpTiming { tcp_start: 1_000, tcp_done: 1_042 };
        assert_eq!(serde_json::to_value(timing).unwrap(), serde_json::json!({"tcpStart": 1000, "tcpDone": 1042}));
        assert_eq!(timing.duration(), 42);
    }
}
