use async_trait::async_trait;
use tracing::{info, warn};

use super::config::ProberConfig;
use super::Prober;
use crate::handlers::{handle_ping_request, handle_tcp_request};
use crate::handlers::http::Transport;
use crate::protocol::{CheckResult, PingRequest, ProbeError, TcpRequest, TcpResponse};
use crate::region::Region;

/// Probes from the host this process runs on
#[derive(Clone)]
pub struct RegionProber {
    config: ProberConfig,
    transport: Transport,
}

impl RegionProber {
    pub fn new(config: ProberConfig) -> anyhow::Result<Self> {
        let transport = Transport::new(config.max_body_bytes)?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    /// Open a TCP connection to the request's target from this region
    pub async fn check_tcp(&self, request: &TcpRequest) -> Result<TcpResponse, ProbeError> {
        let result = handle_tcp_request(self.config.region, request, self.config.default_timeout).await;

        match &result {
            Ok(response) => info!(region = %self.config.region, latency = response.latency, "TCP check completed"),
            Err(error) => {
                warn!(region = %self.config.region, kind = %error.kind, "TCP check failed: {}", error.message)
            }
        }

        result
    }
}

#[async_trait]
impl Prober for RegionProber {
    fn region(&self) -> Region {
        self.config.region
    }

    async fn probe(&self, request: &PingRequest) -> Result<CheckResult, ProbeError> {
        let result =
            handle_ping_request(&self.transport, self.config.region, request, self.config.default_timeout)
                .await;

        match &result {
            Ok(check) => info!(
                region = %self.config.region,
                status = check.status_code,
                latency = check.latency,
                "Probe completed"
            ),
            Err(error) => warn!(region = %self.config.region, kind = %error.kind, "Probe failed: {}", error.message),
        }

        result
    }
}
