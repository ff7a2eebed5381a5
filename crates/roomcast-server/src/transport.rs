//! Quinn-based QUIC transport implementation.
//!
//! Production QUIC transport using the Quinn library. Each client connection
//! carries one session on one bidirectional stream that the client opens by
//! sending its first frame (a ping is conventional). Every frame on that
//! stream is an 8-byte header followed by its payload; see
//! [`roomcast_proto::Frame`].
//!
//! # Security
//!
//! The transport enforces TLS 1.3 via the `rustls` crate. ALPN is set to
//! "roomcast". Self-signed certificates are only suitable for local testing;
//! production deployments MUST use proper TLS certificates from a trusted CA.

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use bytes::BytesMut;
use quinn::{Endpoint, ReadExactError, RecvStream, SendStream, ServerConfig};
use roomcast_core::{FrameSink, FrameSource, Inbound, Outbound, TransportError};
use roomcast_proto::{ALPN_PROTOCOL, Frame, FrameHeader, Opcode, ProtocolError};

use crate::error::ServerError;

/// QUIC transport using Quinn.
///
/// Provides a QUIC endpoint that accepts incoming connections, configured with
/// TLS 1.3 and ALPN protocol "roomcast".
pub struct QuinnTransport {
    /// Quinn endpoint
    endpoint: Endpoint,
}

impl QuinnTransport {
    /// Create and bind a new QUIC transport.
    ///
    /// If `cert_path` and `key_path` are provided, they will be used for TLS.
    /// Otherwise, a self-signed certificate will be generated for testing.
    pub fn bind(
        address: &str,
        cert_path: Option<&str>,
        key_path: Option<&str>,
    ) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let server_config = match (cert_path, key_path) {
            (Some(cert), Some(key)) => load_tls_config(cert, key)?,
            _ => generate_self_signed_config()?,
        };

        let endpoint = Endpoint::server(server_config, addr)
            .map_err(|e| ServerError::Transport(format!("failed to create endpoint: {e}")))?;

        tracing::info!("QUIC transport bound to {}", addr);

        Ok(Self { endpoint })
    }

    /// Accept a new QUIC connection.
    ///
    /// Waits until a connection completes its handshake.
    pub async fn accept(&self) -> Result<QuinnConnection, ServerError> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or_else(|| ServerError::Transport("endpoint closed".to_string()))?;

        let conn = incoming
            .await
            .map_err(|e| ServerError::Transport(format!("connection failed: {e}")))?;

        Ok(QuinnConnection { connection: conn })
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.endpoint
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}

/// A QUIC connection wrapper.
///
/// Clones are cheap and share the same underlying QUIC connection.
#[derive(Clone)]
pub struct QuinnConnection {
    connection: quinn::Connection,
}

impl QuinnConnection {
    /// Accept the session stream and split it into the halves the session
    /// pumps consume.
    ///
    /// Inbound frames larger than `max_frame_size` end the session.
    pub async fn accept_session(
        &self,
        max_frame_size: usize,
    ) -> Result<(QuinnSource, QuinnSink), ServerError> {
        let (send, recv) = self
            .connection
            .accept_bi()
            .await
            .map_err(|e| ServerError::Transport(format!("accept_bi failed: {e}")))?;

        Ok((QuinnSource { recv, max_frame_size }, QuinnSink { send, buf: BytesMut::new() }))
    }

    /// Remote peer address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.connection.remote_address()
    }

    /// Wait until the connection is closed by either side.
    pub async fn closed(&self) {
        let reason = self.connection.closed().await;
        tracing::debug!("Connection closed: {}", reason);
    }

    /// Close the connection with an error code and reason.
    pub fn close(&self, error_code: quinn::VarInt, reason: &[u8]) {
        self.connection.close(error_code, reason);
    }
}

/// Read half of a session stream.
pub struct QuinnSource {
    recv: RecvStream,
    max_frame_size: usize,
}

#[async_trait]
impl FrameSource for QuinnSource {
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        let mut header_buf = [0u8; FrameHeader::SIZE];
        match self.recv.read_exact(&mut header_buf).await {
            Ok(()) => {},
            // stream finished on a frame boundary
            Err(ReadExactError::FinishedEarly(0)) => return Ok(None),
            Err(e) => return Err(TransportError::Io(e.to_string())),
        }

        let header = FrameHeader::from_bytes(&header_buf)?;
        let payload_size = header.payload_size() as usize;
        if payload_size > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: payload_size,
                max: self.max_frame_size,
            });
        }

        let mut payload = vec![0u8; payload_size];
        self.recv
            .read_exact(&mut payload)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        match header.opcode() {
            Some(Opcode::Text) => String::from_utf8(payload)
                .map(|text| Some(Inbound::Text(text)))
                .map_err(|_| ProtocolError::InvalidUtf8.into()),
            Some(Opcode::Ping) => Ok(Some(Inbound::Ping)),
            Some(Opcode::Pong) => Ok(Some(Inbound::Pong)),
            Some(Opcode::Close) => Ok(None),
            None => Err(ProtocolError::UnknownOpcode(header_buf[3]).into()),
        }
    }
}

/// Write half of a session stream.
pub struct QuinnSink {
    send: SendStream,
    buf: BytesMut,
}

impl QuinnSink {
    /// Encode every frame into one buffer and write it in one call.
    async fn write_frames(
        &mut self,
        frames: impl IntoIterator<Item = Frame>,
    ) -> Result<(), TransportError> {
        self.buf.clear();
        for frame in frames {
            frame.encode(&mut self.buf)?;
        }
        self.send.write_all(&self.buf).await.map_err(|e| TransportError::Io(e.to_string()))
    }
}

#[async_trait]
impl FrameSink for QuinnSink {
    async fn send_batch(&mut self, batch: &[Outbound]) -> Result<(), TransportError> {
        let frames: Vec<Frame> = batch
            .iter()
            .map(|item| match item {
                Outbound::Text(text) => Frame::text(text.to_string()),
                Outbound::Pong => Frame::pong(),
            })
            .collect();
        self.write_frames(frames).await
    }

    async fn ping(&mut self) -> Result<(), TransportError> {
        self.write_frames([Frame::ping()]).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.write_frames([Frame::close()]).await?;
        self.send.finish().map_err(|e| TransportError::Io(e.to_string()))?;
        // Resolves once the peer has everything, so closing the connection
        // afterwards cannot drop the tail of the stream.
        self.send.stopped().await.map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Load TLS configuration from certificate and key files.
fn load_tls_config(cert_path: &str, key_path: &str) -> Result<ServerConfig, ServerError> {
    use std::fs;

    let cert_pem = fs::read(cert_path)
        .map_err(|e| ServerError::Config(format!("failed to read cert '{cert_path}': {e}")))?;

    let key_pem = fs::read(key_path)
        .map_err(|e| ServerError::Config(format!("failed to read key '{key_path}': {e}")))?;

    let certs = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Config(format!("failed to parse certificates: {e}")))?;

    let key = rustls_pemfile::private_key(&mut &key_pem[..])
        .map_err(|e| ServerError::Config(format!("failed to parse private key: {e}")))?
        .ok_or_else(|| ServerError::Config("no private key found".to_string()))?;

    let tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Config(format!("invalid TLS config: {e}")))?;

    quic_config(tls_config)
}

/// Generate a self-signed certificate for testing.
fn generate_self_signed_config() -> Result<ServerConfig, ServerError> {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .map_err(|e| ServerError::Config(format!("failed to generate self-signed cert: {e}")))?;

    let cert_chain = vec![cert.cert.der().clone()];
    let key = rustls::pki_types::PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

    let tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key.into())
        .map_err(|e| ServerError::Config(format!("invalid TLS config: {e}")))?;

    tracing::warn!("Using self-signed certificate - not for production use!");

    quic_config(tls_config)
}

fn quic_config(mut tls_config: rustls::ServerConfig) -> Result<ServerConfig, ServerError> {
    tls_config.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let crypto = quinn::crypto::rustls::QuicServerConfig::try_from(tls_config)
        .map_err(|e| ServerError::Config(format!("QUIC config error: {e}")))?;

    Ok(ServerConfig::with_crypto(Arc::new(crypto)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_binds_with_self_signed() {
        let transport = QuinnTransport::bind("127.0.0.1:0", None, None);
        assert!(transport.is_ok(), "Transport should bind with self-signed cert");

        let transport = transport.unwrap();
        let addr = transport.local_addr().unwrap();
        assert_ne!(addr.port(), 0, "Should have assigned a port");
    }

    #[tokio::test]
    async fn transport_rejects_invalid_address() {
        let result = QuinnTransport::bind("invalid:address:format", None, None);
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn transport_binds_with_pem_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, cert.cert.pem()).unwrap();
        std::fs::write(&key_path, cert.key_pair.serialize_pem()).unwrap();

        let transport = QuinnTransport::bind("127.0.0.1:0", cert_path.to_str(), key_path.to_str());
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn transport_reports_missing_pem_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pem");
        let missing = missing.to_str().unwrap();

        let result = QuinnTransport::bind("127.0.0.1:0", Some(missing), Some(missing));
        assert!(matches!(result, Err(ServerError::Config(msg)) if msg.contains("failed to read cert")));
    }
}
