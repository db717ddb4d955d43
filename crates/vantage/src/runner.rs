//! One scheduled check run of one monitor.
//!
//! The runner ties the pieces together: probe every region, judge each
//! result against the monitor's assertions, publish a ping event per region,
//! fold the verdicts into a run outcome and feed it to the status engine.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::assertions::{evaluate, passes, AssertionOutcome};
use crate::orchestrator::MultiRegionOrchestrator;
use crate::protocol::{MonitorSpec, ProbeOutcome};
use crate::publisher::{PingEvent, ResultPublisher};
use crate::region::Region;
use crate::status::{RunOutcome, StatusEngine, StatusTransition};
use crate::timing::now_ms;

/// Verdict of one region within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionVerdict {
    Success,
    /// Passed, but slower than the monitor's degraded-after threshold
    Degraded,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    /// Unix ms of the schedule tick that triggered the run
    pub cron_timestamp: i64,
}

impl RunContext {
    pub fn at(cron_timestamp: i64) -> Self {
        Self { cron_timestamp }
    }

    pub fn now() -> Self {
        Self::at(now_ms())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionReport {
    pub outcome: ProbeOutcome,
    /// Empty for probe errors
    pub assertions: Vec<AssertionOutcome>,
    pub verdict: RegionVerdict,
}

impl RegionReport {
    pub fn region(&self) -> Region {
        self.outcome.region()
    }

    pub fn passed(&self) -> bool {
        self.verdict != RegionVerdict::Failure
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub monitor_id: String,
    /// One entry per requested region, in request order
    pub regions: Vec<RegionReport>,
    pub outcome: RunOutcome,
    pub transition: Option<StatusTransition>,
}

/// Judge one region's outcome against the monitor
pub fn assess(spec: &MonitorSpec, outcome: ProbeOutcome) -> RegionReport {
    let (assertions, verdict) = match &outcome {
        ProbeOutcome::Success(result) => {
            let assertions = evaluate(&spec.assertions, result);
            let verdict = if !passes(&assertions, result) {
                RegionVerdict::Failure
            } else if spec.degraded_after.is_some_and(|threshold| result.latency > threshold) {
                RegionVerdict::Degraded
            } else {
                RegionVerdict::Success
            };
            (assertions, verdict)
        }
        ProbeOutcome::Failure(_) => (Vec::new(), RegionVerdict::Failure),
    };

    RegionReport { outcome, assertions, verdict }
}

/// A run fails as soon as one region failed or errored
pub fn aggregate(regions: &[RegionReport]) -> RunOutcome {
    RunOutcome::from_passed(regions.iter().all(RegionReport::passed))
}

pub struct MonitorRunner {
    orchestrator: Arc<MultiRegionOrchestrator>,
    publisher: Arc<dyn ResultPublisher>,
    status: Arc<StatusEngine>,
}

impl MonitorRunner {
    pub fn new(
        orchestrator: Arc<MultiRegionOrchestrator>,
        publisher: Arc<dyn ResultPublisher>,
        status: Arc<StatusEngine>,
    ) -> Self {
        Self { orchestrator, publisher, status }
    }

    pub fn status(&self) -> &StatusEngine {
        &self.status
    }

    /// Run one check of `spec`.
    ///
    /// Region failures and publish failures are part of the report; only a
    /// status store failure makes the run itself fail.
    pub async fn run(&self, spec: &MonitorSpec, ctx: RunContext) -> anyhow::Result<RunReport> {
        self.status.seed(&spec.id, spec.status).await?;

        let regions: Vec<RegionReport> = self
            .orchestrator
            .run_all(spec)
            .await
            .into_iter()
            .map(|outcome| assess(spec, outcome))
            .collect();

        self.publish(spec, ctx, &regions).await;

        let outcome = aggregate(&regions);
        let transition = self.status.apply(&spec.id, outcome).await?;

        info!(
            monitor_id = %spec.id,
            regions = regions.len(),
            failed = regions.iter().filter(|r| !r.passed()).count(),
            outcome = ?outcome,
            "Check run finished"
        );

        Ok(RunReport { monitor_id: spec.id.clone(), regions, outcome, transition })
    }

    async fn publish(&self, spec: &MonitorSpec, ctx: RunContext, regions: &[RegionReport]) {
        let events: Vec<PingEvent> = regions
            .iter()
            .map(|report| match &report.outcome {
                ProbeOutcome::Success(result) => {
                    PingEvent::from_result(spec, ctx.cron_timestamp, result, report.passed())
                }
                ProbeOutcome::Failure(error) => PingEvent::from_error(spec, ctx.cron_timestamp, error),
            })
            .collect();

        let results = join_all(events.iter().map(|event| self.publisher.publish(event))).await;
        for (event, result) in events.iter().zip(results) {
            if let Err(err) = result {
                error!(monitor_id = %spec.id, region = %event.region, "Dropping ping event: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::assertions::Assertion;
    use crate::orchestrator::OrchestratorConfig;
    use crate::prober::Prober;
    use crate::protocol::{CheckResult, PingRequest, ProbeError, ProbeErrorKind};
    use crate::publisher::{ChannelPublisher, NoopPublisher};
    use crate::retry::RetryPolicy;
    use crate::status::{ChannelNotifier, MemoryStatusStore, MonitorStatus};
    use crate::timing::Timing;

    /// Answers with a fixed status, or hangs when `status` is `None`
    struct StaticProber {
        region: Region,
        status: Option<u16>,
        latency: u64,
    }

    #[async_trait]
    impl Prober for StaticProber {
        fn region(&self) -> Region {
            self.region
        }

        async fn probe(&self, _request: &PingRequest) -> Result<CheckResult, ProbeError> {
            let Some(status_code) = self.status else {
                return std::future::pending().await;
            };
            Ok(CheckResult {
                region: self.region,
                status_code,
                latency: self.latency,
                headers: BTreeMap::new(),
                body: None,
                timing: Timing::default(),
                timestamp: 0,
                redirected: false,
            })
        }
    }

    fn runner(probers: Vec<StaticProber>) -> (MonitorRunner, mpsc::Receiver<PingEvent>) {
        let config = OrchestratorConfig::default()
            .with_retry(RetryPolicy::none())
            .with_grace(Duration::from_millis(20));
        let mut orchestrator = MultiRegionOrchestrator::new(config);
        for prober in probers {
            orchestrator.register(Arc::new(prober));
        }

        let (tx, rx) = mpsc::channel(16);
        let runner = MonitorRunner::new(
            Arc::new(orchestrator),
            Arc::new(ChannelPublisher::new(tx)),
            Arc::new(StatusEngine::in_memory()),
        );
        (runner, rx)
    }

    fn spec() -> MonitorSpec {
        let mut spec = MonitorSpec::new("m1", "https://example.com", vec![Region::Ams, Region::Iad]);
        spec.timeout = 100;
        spec
    }

    #[tokio::test]
    async fn test_all_regions_ok_keeps_monitor_active() {
        let (runner, mut rx) = runner(vec![
            StaticProber { region: Region::Ams, status: Some(200), latency: 20 },
            StaticProber { region: Region::Iad, status: Some(200), latency: 30 },
        ]);

        let report = runner.run(&spec(), RunContext::at(1_000)).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(report.transition, None);
        assert!(report.regions.iter().all(|r| r.verdict == RegionVerdict::Success));
        assert_eq!(runner.status().current("m1").await.unwrap(), MonitorStatus::Active);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.region, second.region), (Region::Ams, Region::Iad));
        assert_eq!(first.cron_timestamp, 1_000);
    }

    #[tokio::test]
    async fn test_timeout_and_server_error_fail_the_run() {
        let (runner, mut rx) = runner(vec![
            StaticProber { region: Region::Ams, status: None, latency: 0 },
            StaticProber { region: Region::Iad, status: Some(500), latency: 30 },
        ]);

        let report = runner.run(&spec(), RunContext::at(1_000)).await.unwrap();

        let ams = report.regions[0].outcome.as_result().unwrap_err();
        assert_eq!(ams.kind, ProbeErrorKind::Timeout);
        assert_eq!(report.regions[1].outcome.as_result().unwrap().status_code, 500);
        assert_eq!(report.regions[1].verdict, RegionVerdict::Failure);

        assert_eq!(report.outcome, RunOutcome::Failure);
        let transition = report.transition.unwrap();
        assert_eq!((transition.from, transition.to), (MonitorStatus::Active, MonitorStatus::Error));

        let ams_event = rx.recv().await.unwrap();
        assert!(ams_event.error);
        assert_eq!(ams_event.status_code, None);

        // Failing again while in error is a no-op
        let report = runner.run(&spec(), RunContext::at(2_000)).await.unwrap();
        assert_eq!(report.transition, None);
    }

    #[tokio::test]
    async fn test_degraded_region_still_passes() {
        let (runner, _rx) = runner(vec![
            StaticProber { region: Region::Ams, status: Some(200), latency: 900 },
            StaticProber { region: Region::Iad, status: Some(200), latency: 30 },
        ]);
        let mut spec = spec();
        spec.degraded_after = Some(500);

        let report = runner.run(&spec, RunContext::at(0)).await.unwrap();
        assert_eq!(report.regions[0].verdict, RegionVerdict::Degraded);
        assert_eq!(report.regions[1].verdict, RegionVerdict::Success);
        assert_eq!(report.outcome, RunOutcome::Success);
    }

    #[tokio::test]
    async fn test_recovery_from_error() {
        let (runner, _rx) = runner(vec![
            StaticProber { region: Region::Ams, status: Some(404), latency: 10 },
            StaticProber { region: Region::Iad, status: Some(404), latency: 10 },
        ]);
        let mut spec = spec();
        spec.status = MonitorStatus::Error;
        spec.assertions = vec![Assertion::status_eq(404)];

        let report = runner.run(&spec, RunContext::at(0)).await.unwrap();
        let transition = report.transition.unwrap();
        assert_eq!(transition.to, MonitorStatus::Active);
    }

    #[test]
    fn test_redirected_result_is_a_failure() {
        let result = CheckResult {
            region: Region::Ams,
            status_code: 200,
            latency: 10,
            headers: BTreeMap::new(),
            body: None,
            timing: Timing::default(),
            timestamp: 0,
            redirected: true,
        };
        let report = assess(&spec(), ProbeOutcome::Success(result));
        assert_eq!(report.verdict, RegionVerdict::Failure);
        assert_eq!(aggregate(&[report]), RunOutcome::Failure);
    }

    fn failing_probers() -> Vec<StaticProber> {
        vec![
            StaticProber { region: Region::Ams, status: Some(500), latency: 10 },
            StaticProber { region: Region::Iad, status: Some(200), latency: 10 },
        ]
    }

    #[tokio::test]
    async fn test_closed_publisher_does_not_fail_the_run() {
        let (runner, rx) = runner(failing_probers());
        drop(rx);

        let report = runner.run(&spec(), RunContext::at(0)).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Failure);
        assert_eq!(report.transition.map(|t| t.to), Some(MonitorStatus::Error));
        assert_eq!(runner.status().current("m1").await.unwrap(), MonitorStatus::Error);
    }

    #[tokio::test]
    async fn test_closed_notifier_does_not_lose_the_transition() {
        let (notify_tx, notify_rx) = mpsc::channel(1);
        drop(notify_rx);
        let status = StatusEngine::new(
            Arc::new(MemoryStatusStore::new()),
            Arc::new(ChannelNotifier::new(notify_tx)),
        );

        let mut orchestrator =
            MultiRegionOrchestrator::new(OrchestratorConfig::default().with_retry(RetryPolicy::none()));
        for prober in failing_probers() {
            orchestrator.register(Arc::new(prober));
        }
        let runner = MonitorRunner::new(Arc::new(orchestrator), Arc::new(NoopPublisher), Arc::new(status));

        let report = runner.run(&spec(), RunContext::at(0)).await.unwrap();
        let transition = report.transition.unwrap();
        assert_eq!((transition.from, transition.to), (MonitorStatus::Active, MonitorStatus::Error));
    }
}
