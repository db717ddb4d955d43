//! Timed HTTP/1.1 exchange over a dedicated connection.
//!
//! Each call resolves, connects, optionally negotiates TLS and sends exactly
//! one request, stamping [`Timing`] at every phase boundary. Connections are
//! never pooled so every probe pays the full cost a first-time visitor pays.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::HOST;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use thiserror::Error;
use tokio::net::{lookup_host, TcpStream};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};
use url::{Host, Position, Url};

use super::extract::{extract_location, extract_response_headers};
use super::headers::OrderedHeaders;
use crate::protocol::ProbeErrorKind;
use crate::timing::{now_ms, Timing};

/// Response bodies are truncated to this many bytes
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("DNS resolution failed for {host}: {message}")]
    Dns { host: String, message: String },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("TLS handshake failed: {0}")]
    Tls(String),

    #[error("HTTP exchange failed: {0}")]
    Http(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            TransportError::Dns { .. } => ProbeErrorKind::DnsFailure,
            TransportError::Connect(_) | TransportError::Http(_) => ProbeErrorKind::Network,
            TransportError::Tls(_) => ProbeErrorKind::TlsFailure,
            TransportError::InvalidRequest(_) => ProbeErrorKind::InvalidRequest,
        }
    }
}

/// One request and its response over one connection
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub location: Option<String>,
    /// `None` when the response carried no body
    pub body: Option<String>,
    pub timing: Timing,
}

#[derive(Clone)]
pub struct Transport {
    tls: TlsConnector,
    max_body_bytes: usize,
}

impl Transport {
    pub fn new(max_body_bytes: usize) -> anyhow::Result<Self> {
        Ok(Self { tls: tls_connector()?, max_body_bytes })
    }

    pub async fn send(
        &self,
        method: &Method,
        url: &Url,
        headers: &OrderedHeaders,
        body: Option<&str>,
    ) -> Result<Exchange, TransportError> {
        let host = url
            .host()
            .ok_or_else(|| TransportError::InvalidRequest(format!("URL has no host: {url}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TransportError::InvalidRequest(format!("URL has no port: {url}")))?;
        let request = build_request(method, url, headers, body)?;

        let mut timing = Timing::default();

        timing.dns_start = now_ms();
        let (addrs, server_name) = match host {
            Host::Domain(domain) => (resolve(domain, port).await?, domain.to_string()),
            Host::Ipv4(ip) => (vec![SocketAddr::new(IpAddr::V4(ip), port)], ip.to_string()),
            Host::Ipv6(ip) => (vec![SocketAddr::new(IpAddr::V6(ip), port)], ip.to_string()),
        };
        timing.dns_done = now_ms();

        timing.connect_start = now_ms();
        let stream = connect(&addrs).await?;
        timing.connect_done = now_ms();

        if url.scheme() == "https" {
            timing.tls_handshake_start = now_ms();
            let name = ServerName::try_from(server_name.as_str())
                .map_err(|e| TransportError::Tls(e.to_string()))?
                .to_owned();
            let stream = self
                .tls
                .connect(name, stream)
                .await
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            timing.tls_handshake_done = now_ms();

            self.exchange(TokioIo::new(stream), request, timing).await
        } else {
            // Zero-width TLS phase anchored at the end of the connect phase
            timing.tls_handshake_start = timing.connect_done;
            timing.tls_handshake_done = timing.connect_done;

            self.exchange(TokioIo::new(stream), request, timing).await
        }
    }

    async fn exchange<T>(
        &self,
        io: T,
        request: Request<Full<Bytes>>,
        mut timing: Timing,
    ) -> Result<Exchange, TransportError>
    where
        T: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
    {
        let (mut sender, connection) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let driver = tokio::spawn(async move {
            if let Err(error) = connection.await {
                debug!("Probe connection closed: {}", error);
            }
        });

        timing.first_byte_start = now_ms();
        let response = sender
            .send_request(request)
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        timing.first_byte_done = now_ms();

        let status = response.status().as_u16();
        let headers = extract_response_headers(response.headers());
        let location = extract_location(response.headers());

        timing.transfer_start = timing.first_byte_done;
        let body = read_body(response.into_body(), self.max_body_bytes).await;
        timing.transfer_done = now_ms();
        driver.abort();

        Ok(Exchange { status, headers, location, body: body?, timing })
    }
}

fn build_request(
    method: &Method,
    url: &Url,
    headers: &OrderedHeaders,
    body: Option<&str>,
) -> Result<Request<Full<Bytes>>, TransportError> {
    let mut builder = Request::builder()
        .method(method.clone())
        .uri(&url[Position::BeforePath..Position::AfterQuery]);

    if !headers.contains(HOST.as_str()) {
        builder = builder.header(HOST, &url[Position::BeforeHost..Position::AfterPort]);
    }
    for (key, value) in headers.iter() {
        builder = builder.header(key, value);
    }

    let body = body.map(|body| Bytes::copy_from_slice(body.as_bytes())).unwrap_or_default();
    builder.body(Full::new(body)).map_err(|e| TransportError::InvalidRequest(e.to_string()))
}

pub(crate) async fn resolve(domain: &str, port: u16) -> Result<Vec<SocketAddr>, TransportError> {
    let addrs: Vec<SocketAddr> = lookup_host((domain, port))
        .await
        .map_err(|e| TransportError::Dns { host: domain.to_string(), message: e.to_string() })?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::Dns {
            host: domain.to_string(),
            message: "no addresses found".to_string(),
        });
    }

    Ok(addrs)
}

/// Try every resolved address in order, keeping the last error
pub(crate) async fn connect(addrs: &[SocketAddr]) -> Result<TcpStream, TransportError> {
    let mut last_error = None;

    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                return Ok(stream);
            }
            Err(error) => {
                debug!(%addr, "Connect attempt failed: {}", error);
                last_error = Some(error);
            }
        }
    }

    Err(TransportError::Connect(
        last_error.map(|e| e.to_string()).unwrap_or_else(|| "no address to connect to".to_string()),
    ))
}

/// Read the whole body, keeping at most `cap` bytes
async fn read_body(mut body: Incoming, cap: usize) -> Result<Option<String>, TransportError> {
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| TransportError::Http(e.to_string()))?;
        if let Ok(data) = frame.into_data() {
            let remaining = cap.saturating_sub(buffer.len());
            buffer.extend_from_slice(&data[..data.len().min(remaining)]);
        }
    }

    if buffer.is_empty() {
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

fn tls_connector() -> anyhow::Result<TlsConnector> {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        warn!("Failed to load native root certificate: {}", error);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!(added, ignored, "Loaded native root certificates");

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsConnector::from(Arc::new(config)))
}
