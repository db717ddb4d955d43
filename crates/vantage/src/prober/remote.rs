use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::Prober;
use crate::protocol::{CheckResult, ErrorBody, PingRequest, PingResponse, ProbeError, ProbeErrorKind, PING_PATH};
use crate::region::Region;
use crate::DEFAULT_TIMEOUT_MS;

/// Extra time granted to a checker on top of the probe timeout
const CHECKER_GRACE: Duration = Duration::from_secs(2);

/// Delegates probes to the checker deployed in a region
#[derive(Debug, Clone)]
pub struct RemoteProber {
    region: Region,
    endpoint: String,
    secret: Option<String>,
    client: Client,
}

impl RemoteProber {
    /// `base_url` is the checker deployment, `secret` its bearer token
    pub fn new(region: Region, base_url: &str, secret: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(crate::USER_AGENT).build()?;
        Ok(Self::with_client(region, base_url, secret, client))
    }

    /// Share one HTTP client between the probers of several regions
    pub fn with_client(region: Region, base_url: &str, secret: Option<String>, client: Client) -> Self {
        let endpoint = format!("{}{}/{}", base_url.trim_end_matches('/'), PING_PATH, region.code());
        Self { region, endpoint, secret, client }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn decode(&self, status: reqwest::StatusCode, text: &str) -> Result<CheckResult, ProbeError> {
        if status.is_success() {
            return serde_json::from_str::<PingResponse>(text)
                .map(|response| CheckResult::from_response(self.region, response))
                .map_err(|e| ProbeError::schema_violation(self.region, format!("Invalid probe result: {e}")));
        }

        match serde_json::from_str::<ErrorBody>(text) {
            Ok(ErrorBody { mut error }) => {
                error.region = self.region;
                Err(error)
            }
            Err(_) => Err(ProbeError::schema_violation(
                self.region,
                format!("Checker answered {}: {}", status.as_u16(), snippet(text)),
            )),
        }
    }
}

#[async_trait]
impl Prober for RemoteProber {
    fn region(&self) -> Region {
        self.region
    }

    async fn probe(&self, request: &PingRequest) -> Result<CheckResult, ProbeError> {
        let timeout = Duration::from_millis(request.timeout.unwrap_or(DEFAULT_TIMEOUT_MS));
        debug!(region = %self.region, endpoint = %self.endpoint, "Delegating probe to checker");

        let mut call = self
            .client
            .post(&self.endpoint)
            .timeout(timeout + CHECKER_GRACE)
            .header("fly-prefer-region", self.region.code())
            .json(request);
        if let Some(secret) = &self.secret {
            call = call.bearer_auth(secret);
        }

        let start = Instant::now();
        let outcome = match call.send().await {
            Ok(response) => {
                let status = response.status();
                response.text().await.map(|text| (status, text))
            }
            Err(error) => Err(error),
        };
        let latency = start.elapsed().as_millis() as u64;

        let (status, text) = outcome.map_err(|error| {
            warn!(region = %self.region, "Checker call failed: {}", error);
            if error.is_timeout() {
                ProbeError::timeout(self.region, latency)
            } else {
                ProbeError::new(self.region, ProbeErrorKind::Network, error.to_string()).with_latency(latency)
            }
        })?;

        self.decode(status, &text)
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
