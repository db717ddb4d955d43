use std::sync::Arc;
use std::time::Duration;

use actix_web::HttpRequest;
use actix_web::http::header::AUTHORIZATION;
use tracing::warn;
use vantage::status::{MemoryStatusStore, Notifier, TracingNotifier};
use vantage::{
    HttpPublisher, MonitorRunner, MultiRegionOrchestrator, NoopPublisher, OrchestratorConfig, ProberConfig,
    Region, RegionProber, ResultPublisher, StatusEngine,
};

use crate::config::CheckerConfig;
use crate::error::AppError;

/// Shared state of a checker pinned to one region
pub struct AppState {
    pub region: Region,
    secret: Option<String>,
    pub prober: Arc<RegionProber>,
    orchestrator: Arc<MultiRegionOrchestrator>,
    publisher: Arc<dyn ResultPublisher>,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: &CheckerConfig) -> anyhow::Result<Self> {
        let prober_config = ProberConfig::builder()
            .region(config.checker.region)
            .default_timeout(Duration::from_millis(config.checker.request_timeout_ms))
            .build();
        let prober = Arc::new(RegionProber::new(prober_config)?);
        let orchestrator = MultiRegionOrchestrator::new(OrchestratorConfig::default()).with_prober(prober.clone());

        let publisher: Arc<dyn ResultPublisher> = match (&config.publisher.endpoint, &config.publisher.token) {
            (Some(endpoint), Some(token)) => {
                Arc::new(HttpPublisher::with_datasource(endpoint, token.clone(), &config.publisher.datasource)?)
            }
            _ => {
                warn!("No publisher configured, ping events are discarded");
                Arc::new(NoopPublisher)
            }
        };

        Ok(Self {
            region: config.checker.region,
            secret: config.checker.secret.clone(),
            prober,
            orchestrator: Arc::new(orchestrator),
            publisher,
            notifier: Arc::new(TracingNotifier),
        })
    }

    /// Check the bearer token; every request is refused when no secret is set
    pub fn authorize(&self, request: &HttpRequest) -> Result<(), AppError> {
        let Some(secret) = self.secret.as_deref().filter(|secret| !secret.is_empty()) else {
            warn!("No checker secret configured, refusing request");
            return Err(AppError::Unauthorized);
        };

        let token = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match token {
            Some(token) if constant_time_eq(token.as_bytes(), secret.as_bytes()) => Ok(()),
            _ => Err(AppError::Unauthorized),
        }
    }

    /// A runner whose status engine starts from the status the caller sent
    pub fn runner(&self) -> MonitorRunner {
        let status = StatusEngine::new(Arc::new(MemoryStatusStore::new()), self.notifier.clone());
        MonitorRunner::new(self.orchestrator.clone(), self.publisher.clone(), Arc::new(status))
    }
}

/// Compare without exiting on the first mismatching byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"s3cret", b"s3cret"));
        assert!(!constant_time_eq(b"s3cret", b"s3creT"));
        assert!(!constant_time_eq(b"s3cret", b"s3cret!"));
        assert!(!constant_time_eq(b"", b"x"));
    }
}
