//! Publishing of probe outcomes to the analytics store.
//!
//! Every region result of a run is turned into a [`PingEvent`]. Publishing
//! is a side effect of the run; a failed publish is logged by the caller and
//! never changes the run's outcome.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::assertions::Assertion;
use crate::protocol::{CheckResult, MonitorSpec, ProbeError};
use crate::region::Region;
use crate::retry::RetryPolicy;
use crate::timing::Timing;

/// Datasource ping events are appended to
pub const DEFAULT_DATASOURCE: &str = "ping_response__v8";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Publisher answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Publisher channel closed")]
    ChannelClosed,
}

/// One published row per region and run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingEvent {
    pub workspace_id: String,
    pub monitor_id: String,
    pub url: String,
    pub region: Region,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub latency: u64,
    /// Unix ms at which the probe started
    pub timestamp: i64,
    /// Unix ms of the schedule tick that triggered the run
    pub cron_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
    /// Whether the region counted as failed
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
}

impl PingEvent {
    pub fn from_result(spec: &MonitorSpec, cron_timestamp: i64, result: &CheckResult, passed: bool) -> Self {
        Self {
            workspace_id: spec.workspace_id.clone(),
            monitor_id: spec.id.clone(),
            url: spec.url.clone(),
            region: result.region,
            status_code: Some(result.status_code),
            latency: result.latency,
            timestamp: result.timestamp,
            cron_timestamp,
            timing: Some(result.timing),
            error: !passed,
            message: None,
            assertions: spec.assertions.clone(),
        }
    }

    /// Error events carry no status code; their timestamp is the cron tick
    pub fn from_error(spec: &MonitorSpec, cron_timestamp: i64, error: &ProbeError) -> Self {
        Self {
            workspace_id: spec.workspace_id.clone(),
            monitor_id: spec.id.clone(),
            url: spec.url.clone(),
            region: error.region,
            status_code: None,
            latency: error.latency,
            timestamp: cron_timestamp,
            cron_timestamp,
            timing: None,
            error: true,
            message: Some(error.to_string()),
            assertions: spec.assertions.clone(),
        }
    }
}

#[async_trait]
pub trait ResultPublisher: Send + Sync {
    async fn publish(&self, event: &PingEvent) -> Result<(), PublishError>;
}

/// Appends events to an HTTP events endpoint as NDJSON
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: Client,
    url: String,
    token: String,
    retry: RetryPolicy,
}

impl HttpPublisher {
    pub fn new(endpoint: &str, token: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_datasource(endpoint, token, DEFAULT_DATASOURCE)
    }

    pub fn with_datasource(endpoint: &str, token: impl Into<String>, datasource: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            url: format!("{}/v0/events?name={}", endpoint.trim_end_matches('/'), datasource),
            token: token.into(),
            retry: RetryPolicy::default().with_max_retries(3),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, line: &str) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(line.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Rejected { status: status.as_u16(), body })
    }
}

#[async_trait]
impl ResultPublisher for HttpPublisher {
    async fn publish(&self, event: &PingEvent) -> Result<(), PublishError> {
        let line = format!("{}\n", serde_json::to_string(event)?);

        let result = self
            .retry
            .run(
                || self.send(&line),
                |outcome| match outcome {
                    Err(PublishError::Rejected { status, .. }) => *status >= 500 || *status == 429,
                    Err(PublishError::Http(_)) => true,
                    _ => false,
                },
            )
            .await;

        match &result {
            Ok(()) => debug!(monitor_id = %event.monitor_id, region = %event.region, "Published ping event"),
            Err(error) => warn!(monitor_id = %event.monitor_id, region = %event.region, "Failed to publish ping event: {}", error),
        }

        result
    }
}

/// Forwards events into a channel
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<PingEvent>,
}

impl ChannelPublisher {
    pub fn new(tx: mpsc::Sender<PingEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ResultPublisher for ChannelPublisher {
    async fn publish(&self, event: &PingEvent) -> Result<(), PublishError> {
        self.tx.send(event.clone()).await.map_err(|_| PublishError::ChannelClosed)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl ResultPublisher for NoopPublisher {
    async fn publish(&self, _event: &PingEvent) -> Result<(), PublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::protocol::ProbeErrorKind;

    fn spec() -> MonitorSpec {
        let mut spec = MonitorSpec::new("42", "https://example.com", vec![Region::Ams]);
        spec.workspace_id = "7".to_string();
        spec
    }

    #[test]
    fn test_event_from_result() {
        let result = CheckResult {
            region: Region::Ams,
            status_code: 503,
            latency: 80,
            headers: BTreeMap::new(),
            body: None,
            timing: Timing::default(),
            timestamp: 1_700_000_000_123,
            redirected: false,
        };
        let event = PingEvent::from_result(&spec(), 1_700_000_000_000, &result, false);

        assert_eq!(event.status_code, Some(503));
        assert_eq!(event.timestamp, 1_700_000_000_123);
        assert_eq!(event.cron_timestamp, 1_700_000_000_000);
        assert!(event.error);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["monitorId"], "42");
        assert_eq!(json["workspaceId"], "7");
    }

    #[test]
    fn test_event_from_error() {
        let error = ProbeError::new(Region::Iad, ProbeErrorKind::DnsFailure, "no such host");
        let event = PingEvent::from_error(&spec(), 1_700_000_000_000, &error);

        assert_eq!(event.region, Region::Iad);
        assert_eq!(event.status_code, None);
        assert!(event.error);
        assert_eq!(event.message.as_deref(), Some("dns-failure in iad: no such host"));
    }

    #[test]
    fn test_http_publisher_url() {
        let publisher = HttpPublisher::new("https://api.tinybird.co/", "token").unwrap();
        assert_eq!(publisher.url(), "https://api.tinybird.co/v0/events?name=ping_response__v8");
    }

    #[tokio::test]
    async fn test_channel_publisher() {
        let (tx, mut rx) = mpsc::channel(1);
        let error = ProbeError::timeout(Region::Gru, 100);
        let event = PingEvent::from_error(&spec(), 0, &error);

        ChannelPublisher::new(tx).publish(&event).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), event);
    }
}
