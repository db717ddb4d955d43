//! Region probers.
//!
//! A [`Prober`] executes one ping request from one geographic region. The
//! [`RegionProber`] runs the request in-process; the [`RemoteProber`]
//! delegates it to the checker deployed in its region.

mod config;
mod local;
mod remote;

use async_trait::async_trait;

pub use config::{ProberConfig, ProberConfigBuilder};
pub use local::RegionProber;
pub use remote::RemoteProber;

use crate::protocol::{CheckResult, PingRequest, ProbeError};
use crate::region::Region;

#[async_trait]
pub trait Prober: Send + Sync {
    /// The region this prober measures from
    fn region(&self) -> Region;

    /// Execute one request; every failure is a typed [`ProbeError`] of this
    /// prober's region.
    async fn probe(&self, request: &PingRequest) -> Result<CheckResult, ProbeError>;
}
