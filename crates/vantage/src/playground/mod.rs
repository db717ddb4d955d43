//! Ad-hoc "playground" checks.
//!
//! A playground run probes every available region once, without assertions
//! or retries, and caches the result under a fresh id for a day so it can be
//! shared and looked up later.

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use memory::MemoryPlaygroundStore;
pub use redis_store::RedisPlaygroundStore;

use crate::orchestrator::MultiRegionOrchestrator;
use crate::protocol::{CheckResult, PingRequest, ProbeOutcome};
use crate::retry::RetryPolicy;
use crate::timing::now_ms;

/// How long a playground run stays retrievable
pub const PLAYGROUND_TTL: Duration = Duration::from_secs(86_400);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt entry {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// What was checked, stored once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseCheck {
    pub url: String,
    pub method: String,
    /// Unix ms at which the run started
    pub time: i64,
}

/// A cached run: its base plus every region result, bodies stripped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedCheck {
    pub url: String,
    pub method: String,
    pub time: i64,
    pub checks: Vec<CheckResult>,
}

impl CachedCheck {
    pub fn new(base: BaseCheck, mut checks: Vec<CheckResult>) -> Self {
        checks.sort_by_key(|check| check.region);
        Self { url: base.url, method: base.method, time: base.time, checks }
    }
}

#[async_trait]
pub trait PlaygroundStore: Send + Sync {
    async fn store_base(&self, id: &str, base: &BaseCheck) -> Result<(), StoreError>;

    /// Add one region result; the body is never persisted
    async fn store_check(&self, id: &str, check: &CheckResult) -> Result<(), StoreError>;

    /// `None` once the run expired or if it never existed
    async fn get(&self, id: &str) -> Result<Option<CachedCheck>, StoreError>;
}

pub(crate) fn base_key(id: &str) -> String {
    format!("check:base:{id}")
}

pub(crate) fn data_key(id: &str) -> String {
    format!("check:data:{id}")
}

#[derive(Debug, Clone)]
pub struct PlaygroundRun {
    pub id: String,
    /// One outcome per available region, bodies stripped
    pub outcomes: Vec<ProbeOutcome>,
}

/// Probe every region the orchestrator knows and cache the results
pub async fn run_playground(
    orchestrator: &MultiRegionOrchestrator,
    store: &dyn PlaygroundStore,
    request: &PingRequest,
) -> Result<PlaygroundRun, StoreError> {
    let id = Uuid::new_v4().to_string();
    let time = now_ms();
    let regions = orchestrator.regions();

    info!(id = %id, url = %request.url, "Running playground check");
    let outcomes: Vec<ProbeOutcome> = orchestrator
        .run_regions(request, &regions, &[], &RetryPolicy::none())
        .await
        .into_iter()
        .map(|outcome| match outcome {
            ProbeOutcome::Success(check) => ProbeOutcome::Success(check.without_body()),
            failure => failure,
        })
        .collect();

    let base = BaseCheck { url: request.url.clone(), method: request.method.to_uppercase(), time };
    store.store_base(&id, &base).await?;
    for outcome in &outcomes {
        if let ProbeOutcome::Success(check) = outcome {
            store.store_check(&id, check).await?;
        }
    }

    Ok(PlaygroundRun { id, outcomes })
}
