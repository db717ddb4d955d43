//! Protocol module for Vantage.
//!
//! This module contains the probe wire types exchanged with regional
//! checkers and the records produced by a check run.

pub mod error;
pub mod monitor;
pub mod tcp;
pub mod types;

pub use error::{ErrorBody, ProbeError, ProbeErrorKind};
pub use monitor::MonitorSpec;
pub use tcp::{TcpRequest, TcpResponse, TcpTiming};
pub use types::{CheckResult, Header, HttpMethod, PingRequest, PingResponse, ProbeOutcome};

/// Path prefix of the probe execution endpoint (`POST /ping/{region}`)
pub const PING_PATH: &str = "/ping";

/// Path prefix of the TCP check endpoint (`POST /tcp/{region}`)
pub const TCP_PATH: &str = "/tcp";
