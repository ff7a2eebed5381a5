//! QUIC end-to-end tests
//!
//! A real server on a loopback port and real quinn clients (accepting the
//! self-signed certificate) exchanging binary frames.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::BytesMut;
use quinn::{ClientConfig, Endpoint, RecvStream, SendStream};
use roomcast_core::{Registry, SessionConfig};
use roomcast_proto::{ALPN_PROTOCOL, Frame, FrameHeader, HELP_TEXT, Opcode, WireRecord};
use roomcast_server::{Server, ServerRuntimeConfig, SystemEnv};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn start_server() -> (SocketAddr, Arc<Registry<SystemEnv>>) {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        session: SessionConfig { quit_grace: Duration::from_millis(50), ..SessionConfig::default() },
        ..ServerRuntimeConfig::default()
    };
    let server = Server::bind(config).unwrap();
    let addr = server.local_addr().unwrap();
    let registry = Arc::clone(server.registry());
    tokio::spawn(server.run());
    (addr, registry)
}

struct TestClient {
    _endpoint: Endpoint,
    _connection: quinn::Connection,
    send: SendStream,
    recv: RecvStream,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let mut endpoint = Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap();
        endpoint.set_default_client_config(insecure_client_config());

        let connection = endpoint.connect(addr, "localhost").unwrap().await.unwrap();
        let (send, recv) = connection.open_bi().await.unwrap();

        let mut client = Self { _endpoint: endpoint, _connection: connection, send, recv };
        // the server sees the stream once its first frame arrives
        client.send_frame(&Frame::ping()).await;
        client
    }

    async fn send_frame(&mut self, frame: &Frame) {
        let mut buf = Vec::new();
        frame.encode(&mut buf).unwrap();
        self.send.write_all(&buf).await.unwrap();
    }

    async fn say(&mut self, text: &str) {
        self.send_frame(&Frame::text(text)).await;
    }

    /// Next frame, or `None` once the stream ends.
    async fn next_frame(&mut self) -> Option<Frame> {
        let mut header = [0u8; FrameHeader::SIZE];
        self.recv.read_exact(&mut header).await.ok()?;
        let payload_size = FrameHeader::from_bytes(&header).unwrap().payload_size() as usize;

        let mut buf = BytesMut::from(&header[..]);
        buf.resize(FrameHeader::SIZE + payload_size, 0);
        self.recv.read_exact(&mut buf[FrameHeader::SIZE..]).await.unwrap();
        Some(Frame::decode(&buf).unwrap())
    }

    /// Next text frame, skipping keepalive traffic. `None` on close.
    async fn next_text(&mut self) -> Option<String> {
        loop {
            let frame = self.next_frame().await?;
            match frame.opcode() {
                Some(Opcode::Text) => return Some(frame.as_text().unwrap().to_string()),
                Some(Opcode::Close) => return None,
                _ => {},
            }
        }
    }

    async fn expect_content(&mut self, content: &str) -> WireRecord {
        loop {
            let text = self.next_text().await.unwrap();
            if let Ok(record) = WireRecord::parse(&text) {
                if record.content == content {
                    return record;
                }
            }
        }
    }
}

fn insecure_client_config() -> ClientConfig {
    let mut crypto = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureCertVerifier))
        .with_no_client_auth();
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    ClientConfig::new(Arc::new(quinn::crypto::rustls::QuicClientConfig::try_from(crypto).unwrap()))
}

#[derive(Debug)]
struct InsecureCertVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

#[tokio::test]
async fn greeting_chat_and_quit_over_quic() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let (addr, _registry) = start_server().await;
        let mut client = TestClient::connect(addr).await;

        assert_eq!(client.next_text().await.unwrap(), "/userRoom waitingRoom");
        client.expect_content("New User joined the room").await;
        client.expect_content(HELP_TEXT).await;

        client.say("/name alice").await;
        client.expect_content("New User set their name to alice").await;

        client.say("hello over quic").await;
        let record = client.expect_content("hello over quic").await;
        assert_eq!(record.sender, "alice");

        client.say("/quit").await;
        client.expect_content("Exiting program...").await;
        assert_eq!(client.next_text().await.unwrap(), "/quit");
        assert_eq!(client.next_text().await, None);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn peer_ping_gets_pong() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let (addr, _registry) = start_server().await;
        let mut client = TestClient::connect(addr).await;

        // the connecting ping is answered after the greeting
        loop {
            let frame = client.next_frame().await.unwrap();
            if frame.opcode() == Some(Opcode::Pong) {
                break;
            }
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn two_clients_share_the_lobby() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let (addr, registry) = start_server().await;
        let mut alice = TestClient::connect(addr).await;
        alice.expect_content(HELP_TEXT).await;
        let mut bob = TestClient::connect(addr).await;
        bob.expect_content(HELP_TEXT).await;
        alice.expect_content("New User joined the room").await;

        bob.say("hi alice").await;
        assert_eq!(alice.expect_content("hi alice").await.sender, "New User");
        bob.expect_content("hi alice").await;

        alice.say("/users").await;
        alice.expect_content("Client List: New User, New User").await;
        assert_eq!(registry.room_names(), vec!["waitingRoom"]);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn oversized_frame_ends_session() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let (addr, _registry) = start_server().await;
        let mut client = TestClient::connect(addr).await;
        client.expect_content(HELP_TEXT).await;

        client.say(&"x".repeat(600)).await;

        let mut saw_close = false;
        while let Some(frame) = client.next_frame().await {
            if frame.opcode() == Some(Opcode::Close) {
                saw_close = true;
                break;
            }
        }
        assert!(saw_close);
    })
    .await
    .unwrap();
}
