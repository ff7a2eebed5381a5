//! Roomcast production server.
//!
//! Production glue around [`roomcast_core`]: Quinn for QUIC transport, Tokio
//! for the async runtime, system time and OS randomness for the environment.
//!
//! # Architecture
//!
//! The broker logic (sessions, rooms, registry, commands) is
//! transport-agnostic and lives in [`roomcast_core`]. This crate accepts QUIC
//! connections, turns each one into a [`FrameSource`]/[`FrameSink`] pair and
//! hands it to [`roomcast_core::serve_connection`] on its own task.
//!
//! # Components
//!
//! - [`Server`]: accept loop, one task per connection
//! - [`QuinnTransport`]: QUIC transport via Quinn library
//! - [`SystemEnv`]: production environment (real time, crypto RNG)
//!
//! [`FrameSource`]: roomcast_core::FrameSource
//! [`FrameSink`]: roomcast_core::FrameSink

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod system_env;
mod transport;

use std::{sync::Arc, time::Duration};

pub use error::ServerError;
use roomcast_core::{Registry, RoomConfig, SessionConfig, serve_connection};
pub use system_env::SystemEnv;
pub use transport::{QuinnConnection, QuinnSink, QuinnSource, QuinnTransport};

/// Default address to bind to.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:4433";

/// Default inbound frame payload limit in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512;

/// How long a finished session waits for the peer to hang up before the
/// server closes the connection itself.
const CLOSE_LINGER: Duration = Duration::from_secs(2);

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:4433")
    pub bind_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<String>,
    /// Largest inbound frame payload accepted; bigger frames end the session
    pub max_frame_size: usize,
    /// Per-session settings (mailbox, deadlines, lobby)
    pub session: SessionConfig,
    /// Settings applied to every room
    pub room: RoomConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            cert_path: None,
            key_path: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            session: SessionConfig::default(),
            room: RoomConfig::default(),
        }
    }
}

/// Production Roomcast server.
pub struct Server {
    /// QUIC endpoint
    transport: QuinnTransport,
    /// Room directory shared by every session
    registry: Arc<Registry<SystemEnv>>,
    /// Per-session settings
    session_config: Arc<SessionConfig>,
    /// Inbound frame payload limit
    max_frame_size: usize,
}

impl Server {
    /// Create and bind a new server.
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        if config.session.ping_period >= config.session.pong_wait {
            return Err(ServerError::Config(format!(
                "ping period {:?} must be shorter than pong wait {:?}",
                config.session.ping_period, config.session.pong_wait
            )));
        }

        let transport = QuinnTransport::bind(
            &config.bind_address,
            config.cert_path.as_deref(),
            config.key_path.as_deref(),
        )?;
        let registry = Registry::new(SystemEnv::new(), config.room);

        Ok(Self {
            transport,
            registry,
            session_config: Arc::new(config.session),
            max_frame_size: config.max_frame_size,
        })
    }

    /// Run the server, accepting connections and serving sessions.
    ///
    /// This method runs until the endpoint is closed.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let registry = Arc::clone(&self.registry);
                    let config = Arc::clone(&self.session_config);
                    let max_frame_size = self.max_frame_size;

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, registry, config, max_frame_size).await
                        {
                            tracing::debug!("Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Room directory shared by every session.
    pub fn registry(&self) -> &Arc<Registry<SystemEnv>> {
        &self.registry
    }
}

/// Serve one QUIC connection as one session.
async fn handle_connection(
    conn: QuinnConnection,
    registry: Arc<Registry<SystemEnv>>,
    config: Arc<SessionConfig>,
    max_frame_size: usize,
) -> Result<(), ServerError> {
    tracing::debug!("New connection from {}", conn.remote_addr());

    let (source, sink) = conn.accept_session(max_frame_size).await?;

    // The session logs its own outcome.
    let outcome = serve_connection(registry, config, source, sink).await;

    let (code, reason): (u32, &[u8]) = match outcome {
        Ok(()) => (0, b"session closed"),
        Err(_) => (1, b"session failed"),
    };

    // Closing discards anything the peer has not read yet.
    if tokio::time::timeout(CLOSE_LINGER, conn.closed()).await.is_err() {
        conn.close(code.into(), reason);
    }
    Ok(())
}
