//! TLS transport to the printer camera port.

use std::future::Future;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::auth::auth_record;
use crate::config::CameraConfig;
use crate::error::TransportError;

const READ_CHUNK: usize = 64 * 1024;

/// Byte stream a [`Connection`] can run over.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is being set up.
    Connecting,
    /// Authenticated and readable.
    Open,
    /// Peer closed the stream or the connection was destroyed.
    Closed,
    /// A read failed.
    Errored,
}

/// Signal produced by [`Connection::next_event`].
#[derive(Debug)]
pub enum TransportEvent<'a> {
    /// Bytes received, in stream order.
    Data(&'a [u8]),
    /// The stream ended.
    Closed,
    /// The stream failed.
    Errored(std::io::Error),
}

/// An authenticated camera stream.
pub struct Connection {
    stream: Option<Box<dyn ByteStream>>,
    state: ConnectionState,
    read_buf: Vec<u8>,
}

impl Connection {
    /// Wrap an already authenticated stream.
    pub fn new(stream: impl ByteStream + 'static) -> Self {
        Self {
            stream: Some(Box::new(stream)),
            state: ConnectionState::Open,
            read_buf: vec![0u8; READ_CHUNK],
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Wait for the next ingress signal.
    ///
    /// After `Closed` or `Errored` every further call returns `Closed`.
    pub async fn next_event(&mut self) -> TransportEvent<'_> {
        let Some(stream) = self.stream.as_mut() else {
            return TransportEvent::Closed;
        };
        match stream.read(&mut self.read_buf).await {
            Ok(0) => {
                self.stream = None;
                self.state = ConnectionState::Closed;
                TransportEvent::Closed
            }
            Ok(n) => TransportEvent::Data(&self.read_buf[..n]),
            Err(e) => {
                self.stream = None;
                self.state = ConnectionState::Errored;
                TransportEvent::Errored(e)
            }
        }
    }

    /// Close the stream. Safe to call repeatedly and from any state.
    pub fn destroy(&mut self) {
        if self.stream.take().is_some() {
            debug!("camera stream closed locally");
        }
        if matches!(
            self.state,
            ConnectionState::Open | ConnectionState::Connecting
        ) {
            self.state = ConnectionState::Closed;
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Opens authenticated camera connections.
pub trait Connector: Send + Sync {
    /// Connect to the printer described by `config` and authenticate.
    fn connect(
        &self,
        config: &CameraConfig,
    ) -> impl Future<Output = Result<Connection, TransportError>> + Send;
}

/// Write the authentication record to a freshly opened stream.
pub async fn authenticate<S>(
    stream: &mut S,
    username: &str,
    access_code: &str,
) -> Result<(), TransportError>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let record = auth_record(username, access_code);
    stream
        .write_all(&record)
        .await
        .map_err(TransportError::AuthWrite)?;
    stream.flush().await.map_err(TransportError::AuthWrite)
}

/// Connector for real printers: TCP, TLS without certificate validation,
/// then the auth record.
#[derive(Clone)]
pub struct TlsCameraConnector {
    tls: tokio_rustls::TlsConnector,
}

impl TlsCameraConnector {
    /// Create a connector.
    pub fn new() -> Result<Self, TransportError> {
        let config = insecure_client_config()?;
        Ok(Self {
            tls: tokio_rustls::TlsConnector::from(Arc::new(config)),
        })
    }
}

impl Connector for TlsCameraConnector {
    async fn connect(&self, config: &CameraConfig) -> Result<Connection, TransportError> {
        let addr = config.addr();
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;
        if let Err(e) = tcp.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY on {}: {}", addr, e);
        }

        let server_name = ServerName::try_from(config.host.as_str())
            .map_err(|e| TransportError::Tls(e.to_string()))?
            .to_owned();
        let mut stream = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        debug!("TLS established with {}", addr);

        authenticate(&mut stream, &config.username, &config.access_code).await?;
        Ok(Connection::new(stream))
    }
}

/// Client config that accepts any server certificate.
///
/// Printers present self-signed certificates for their own serial number,
/// so there is nothing to validate against. Handshake signatures are still
/// checked.
fn insecure_client_config() -> Result<ClientConfig, TransportError> {
    let provider = CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    let config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
        .with_no_client_auth();
    Ok(config)
}

#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
