//! Probe handlers for Vantage.
//!
//! This module executes a single ping request from the local vantage point:
//! validation, the timed HTTP exchange and the mapping of its outcome.

pub mod http;
pub mod response;
pub mod tcp;
pub mod validation;

// Re-export main handler function
pub use http::{handle_ping_request, perform_http_request};
pub use response::{build_check_result, build_error_body, build_probe_error, build_timeout_error};
pub use tcp::{handle_tcp_request, ping_tcp};
pub use validation::{validate_ping_request, validate_tcp_request};
