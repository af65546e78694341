//! Transport: parses `tcp+tls://host:port` endpoints, establishes a TLS
//! connection over TCP, and exposes async byte send/recv. Does not
//! interpret message contents.

use std::sync::Arc;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

use crate::error::{FixConnectorError, Result};

/// Parsed form of a `tcp+tls://host:port` endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url.strip_prefix("tcp+tls://").ok_or_else(|| {
            FixConnectorError::InvalidConfig(format!("endpoint must start with tcp+tls://: {url}"))
        })?;
        let (host, port) = rest.rsplit_once(':').ok_or_else(|| {
            FixConnectorError::InvalidConfig(format!("endpoint missing port: {url}"))
        })?;
        let port: u16 = port.parse().map_err(|_| {
            FixConnectorError::InvalidConfig(format!("endpoint port is not numeric: {url}"))
        })?;
        if host.is_empty() {
            return Err(FixConnectorError::InvalidConfig(format!(
                "endpoint missing host: {url}"
            )));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// Byte-oriented transport abstraction. The session engine only ever talks
/// to this trait, so tests can swap in a plain-TCP loopback implementation
/// without standing up real TLS.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Returns an empty byte-string on orderly close.
    async fn recv(&mut self, max_len: usize) -> Result<Vec<u8>>;
}

/// TLS client transport: verifies the peer certificate against webpki
/// roots and uses the endpoint hostname as SNI.
pub struct TlsTransport {
    stream: TlsStream<TcpStream>,
}

impl TlsTransport {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let tcp = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| FixConnectorError::TransportFailure(e.to_string()))?;
        tcp.set_nodelay(true).ok();

        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        let server_name = ServerName::try_from(endpoint.host.clone())
            .map_err(|e| FixConnectorError::InvalidConfig(format!("invalid SNI hostname: {e}")))?;

        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| FixConnectorError::TransportFailure(e.to_string()))?;

        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn send_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|e| FixConnectorError::TransportFailure(e.to_string()))
    }

    async fn recv(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        let n = self
            .stream
            .read(&mut buf)
            .await
            .map_err(|e| FixConnectorError::TransportFailure(e.to_string()))?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Plain-TCP transport used by tests to exercise the session engine without
/// a TLS handshake. Never used against the real venue.
pub struct PlainTcpTransport {
    stream: TcpStream,
}

impl PlainTcpTransport {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| FixConnectorError::TransportFailure(e.to_string()))?;
        stream.set_nodelay(true).ok();
        Ok(Self { stream })
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl Transport for PlainTcpTransport {
    async fn send_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|e| FixConnectorError::TransportFailure(e.to_string()))
    }

    async fn recv(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        let n = self
            .stream
            .read(&mut buf)
            .await
            .map_err(|e| FixConnectorError::TransportFailure(e.to_string()))?;
        buf.truncate(n);
        Ok(buf)
    }
}
