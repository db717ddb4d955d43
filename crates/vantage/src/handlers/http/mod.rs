//! HTTP probe handling for Vantage.
//!
//! This module performs the timed HTTP exchange of a ping request.

mod extract;
mod headers;
mod request;
mod transport;

pub use extract::{extract_location, extract_response_headers};
pub use headers::{request_headers, OrderedHeaders};
pub use request::{handle_ping_request, perform_http_request, MAX_REDIRECTS};
pub use transport::{Exchange, Transport, TransportError, MAX_BODY_BYTES};
pub(crate) use transport::{connect, resolve};
