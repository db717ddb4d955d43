//! Monitor status state machine.
//!
//! A monitor is either `active` or `error`. [`next_status`] is the pure
//! transition function; [`StatusEngine`] wraps it with the persistence and
//! notification side effects, which stay behind the [`StatusStore`] and
//! [`Notifier`] traits.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

/// Stored health of a monitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    #[default]
    Active,
    Error,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Active => write!(f, "active"),
            MonitorStatus::Error => write!(f, "error"),
        }
    }
}

/// Aggregate pass/fail of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    pub fn from_passed(passed: bool) -> Self {
        if passed { RunOutcome::Success } else { RunOutcome::Failure }
    }

    /// The status a monitor should hold after this outcome
    pub fn target_status(&self) -> MonitorStatus {
        match self {
            RunOutcome::Success => MonitorStatus::Active,
            RunOutcome::Failure => MonitorStatus::Error,
        }
    }
}

/// An observable change of a monitor's status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub monitor_id: String,
    pub from: MonitorStatus,
    pub to: MonitorStatus,
}

/// Compute the next status; `None` when the outcome matches the stored status
pub fn next_status(
    monitor_id: &str,
    current: MonitorStatus,
    outcome: RunOutcome,
) -> (MonitorStatus, Option<StatusTransition>) {
    let next = outcome.target_status();
    if next == current {
        return (current, None);
    }

    (next, Some(StatusTransition { monitor_id: monitor_id.to_string(), from: current, to: next }))
}

/// Persistence of the current status per monitor
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Current status, `None` for monitors never seen before
    async fn get_status(&self, monitor_id: &str) -> Result<Option<MonitorStatus>>;

    async fn set_status(&self, monitor_id: &str, status: MonitorStatus) -> Result<()>;
}

/// Receives every status transition, e.g. to dispatch notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, transition: &StatusTransition) -> Result<()>;
}

/// In-memory status store, last write wins
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    statuses: RwLock<HashMap<String, MonitorStatus>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn get_status(&self, monitor_id: &str) -> Result<Option<MonitorStatus>> {
        Ok(self.statuses.read().await.get(monitor_id).copied())
    }

    async fn set_status(&self, monitor_id: &str, status: MonitorStatus) -> Result<()> {
        self.statuses.write().await.insert(monitor_id.to_string(), status);
        Ok(())
    }
}

/// Logs transitions and does nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, transition: &StatusTransition) -> Result<()> {
        info!(
            monitor_id = %transition.monitor_id,
            from = %transition.from,
            to = %transition.to,
            "Monitor status changed"
        );
        Ok(())
    }
}

/// Forwards transitions into a channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<StatusTransition>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<StatusTransition>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, transition: &StatusTransition) -> Result<()> {
        self.tx.send(transition.clone()).await?;
        Ok(())
    }
}

/// Applies run outcomes to stored monitor statuses
pub struct StatusEngine {
    store: Arc<dyn StatusStore>,
    notifier: Arc<dyn Notifier>,
}

impl StatusEngine {
    pub fn new(store: Arc<dyn StatusStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Engine backed by an in-memory store that only logs transitions
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStatusStore::new()), Arc::new(TracingNotifier))
    }

    /// Seed the store with the status a caller already knows, if it has none
    pub async fn seed(&self, monitor_id: &str, status: MonitorStatus) -> Result<()> {
        if self.store.get_status(monitor_id).await?.is_none() {
            self.store.set_status(monitor_id, status).await?;
        }
        Ok(())
    }

    pub async fn current(&self, monitor_id: &str) -> Result<MonitorStatus> {
        Ok(self.store.get_status(monitor_id).await?.unwrap_or_default())
    }

    /// Read, transition, persist on change, then notify.
    ///
    /// Nothing is written and nobody is notified when the outcome matches
    /// the stored status. A failing notifier is logged; the transition is
    /// still returned since the new status is already stored.
    pub async fn apply(&self, monitor_id: &str, outcome: RunOutcome) -> Result<Option<StatusTransition>> {
        let current = self.current(monitor_id).await?;
        let (next, transition) = next_status(monitor_id, current, outcome);

        let Some(transition) = transition else {
            debug!(monitor_id, status = %current, "Monitor status unchanged");
            return Ok(None);
        };

        self.store.set_status(monitor_id, next).await?;
        if let Err(err) = self.notifier.notify(&transition).await {
            error!(monitor_id, to = %transition.to, "Failed to notify status change: {}", err);
        }

        Ok(Some(transition))
    }
}
