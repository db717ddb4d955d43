//! Multi-region fan-out.
//!
//! The orchestrator probes every requested region concurrently and returns
//! exactly one outcome per region, in input order. A failing or hanging
//! region never affects the outcome of another one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, info};

use crate::assertions::{evaluate, passes, Assertion};
use crate::prober::{Prober, RemoteProber};
use crate::protocol::{CheckResult, MonitorSpec, PingRequest, ProbeError, ProbeOutcome};
use crate::region::Region;
use crate::retry::RetryPolicy;
use crate::DEFAULT_TIMEOUT_MS;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Retries applied per region
    pub retry: RetryPolicy,

    /// Slack on top of the probe timeout before a region is abandoned
    pub grace: Duration,

    /// Probe timeout used when a request carries none
    pub default_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            grace: Duration::from_secs(5),
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

pub struct MultiRegionOrchestrator {
    probers: HashMap<Region, Arc<dyn Prober>>,
    config: OrchestratorConfig,
}

impl MultiRegionOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { probers: HashMap::new(), config }
    }

    /// An orchestrator delegating every known region to its checker
    pub fn remote(base_url: &str, secret: Option<String>, config: OrchestratorConfig) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(crate::USER_AGENT).build()?;
        let mut orchestrator = Self::new(config);
        for region in Region::ALL {
            orchestrator.register(Arc::new(RemoteProber::with_client(
                region,
                base_url,
                secret.clone(),
                client.clone(),
            )));
        }
        Ok(orchestrator)
    }

    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.register(prober);
        self
    }

    /// Register a prober, replacing any prober of the same region
    pub fn register(&mut self, prober: Arc<dyn Prober>) {
        self.probers.insert(prober.region(), prober);
    }

    /// Drop every prober whose region is not listed
    pub fn retain(&mut self, regions: &[Region]) {
        self.probers.retain(|region, _| regions.contains(region));
    }

    /// Regions with a registered prober, in catalogue order
    pub fn regions(&self) -> Vec<Region> {
        Region::ALL.into_iter().filter(|region| self.probers.contains_key(region)).collect()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Probe every region of a monitor with the configured retry policy
    pub async fn run_all(&self, spec: &MonitorSpec) -> Vec<ProbeOutcome> {
        self.run_regions(&spec.ping_request(), &spec.regions, &spec.assertions, &self.config.retry).await
    }

    /// Probe `regions` concurrently; the output has one entry per input
    /// region, in the same order.
    pub async fn run_regions(
        &self,
        request: &PingRequest,
        regions: &[Region],
        assertions: &[Assertion],
        retry: &RetryPolicy,
    ) -> Vec<ProbeOutcome> {
        info!(url = %request.url, regions = regions.len(), "Running check in all regions");

        let probes = regions.iter().map(|region| self.probe_region(*region, request, assertions, retry));
        let outcomes = join_all(probes).await;

        let failed = outcomes.iter().filter(|outcome| matches!(outcome, ProbeOutcome::Failure(_))).count();
        debug!(failed, total = outcomes.len(), "All regions settled");

        outcomes
    }

    async fn probe_region(
        &self,
        region: Region,
        request: &PingRequest,
        assertions: &[Assertion],
        retry: &RetryPolicy,
    ) -> ProbeOutcome {
        let Some(prober) = self.probers.get(&region) else {
            return ProbeOutcome::Failure(ProbeError::invalid_request(
                region,
                format!("No prober available for region {region}"),
            ));
        };

        let guard = request.timeout.map(Duration::from_millis).unwrap_or(self.config.default_timeout)
            + self.config.grace;

        let result = retry
            .run(
                || async {
                    let start = Instant::now();
                    match tokio::time::timeout(guard, prober.probe(request)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProbeError::timeout(region, guard.as_millis() as u64)
                            .with_latency(start.elapsed().as_millis() as u64)),
                    }
                },
                |outcome| needs_retry(outcome, assertions),
            )
            .await;

        // A result always belongs to the region it was requested for
        let result = result.map(|mut check| {
            check.region = region;
            check
        });

        ProbeOutcome::from(result)
    }
}

fn needs_retry(outcome: &Result<CheckResult, ProbeError>, assertions: &[Assertion]) -> bool {
    match outcome {
        Ok(result) => !passes(&evaluate(assertions, result), result),
        Err(error) => error.kind.is_retryable(),
    }
}
