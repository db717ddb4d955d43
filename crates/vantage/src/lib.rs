//! Vantage - multi-region HTTP probing core
//!
//! This library runs an HTTP check against a target from one or more
//! geographic regions, measures phase-level timing, evaluates declarative
//! assertions and drives the active/error state machine of a monitor.

pub mod assertions;
pub mod handlers;
pub mod orchestrator;
pub mod playground;
pub mod prober;
pub mod protocol;
pub mod publisher;
pub mod region;
pub mod retry;
pub mod runner;
pub mod status;
pub mod timing;

// Re-export main types
pub use assertions::{Assertion, AssertionOutcome};
pub use orchestrator::{MultiRegionOrchestrator, OrchestratorConfig};
pub use playground::{run_playground, PlaygroundStore};
pub use prober::{Prober, ProberConfig, RegionProber, RemoteProber};
pub use protocol::{
    CheckResult, Header, HttpMethod, MonitorSpec, PingRequest, PingResponse, ProbeError,
    ProbeErrorKind, ProbeOutcome, TcpRequest, TcpResponse, TcpTiming,
};
pub use publisher::{HttpPublisher, NoopPublisher, PingEvent, ResultPublisher};
pub use region::Region;
pub use retry::RetryPolicy;
pub use runner::{MonitorRunner, RegionReport, RegionVerdict, RunContext, RunReport};
pub use status::{MonitorStatus, RunOutcome, StatusEngine, StatusTransition};
pub use timing::{Phase, Timing, TimingPhases};

/// Re-export common error types
pub use anyhow;

/// Vantage result type using anyhow for error handling
pub type Result<T> = anyhow::Result<T>;

/// Header injected into every probe so targets can recognise checker traffic
pub const PING_HEADER: (&str, &str) = ("OpenStatus-Ping", "true");

/// User agent sent with every probe unless the monitor overrides it
pub const USER_AGENT: &str = "OpenStatus/1.0";

/// Default per-probe timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 45_000;
