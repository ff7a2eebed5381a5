//! Roomcast server binary.
//!
//! # Usage
//!
//! ```bash
//! # Start with self-signed certificate (development)
//! roomcast-server --bind 0.0.0.0:4433
//!
//! # Start with TLS certificate (production)
//! roomcast-server --bind 0.0.0.0:4433 --cert cert.pem --key key.pem
//! ```

use std::time::Duration;

use clap::Parser;
use roomcast_core::{RoomConfig, SessionConfig};
use roomcast_server::{
    DEFAULT_BIND_ADDRESS, DEFAULT_MAX_FRAME_SIZE, Server, ServerError, ServerRuntimeConfig,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Roomcast broadcast broker
#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Multi-room text broadcast broker")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = DEFAULT_BIND_ADDRESS)]
    bind: String,

    /// Path to TLS certificate (PEM format)
    #[arg(short, long)]
    cert: Option<String>,

    /// Path to TLS private key (PEM format)
    #[arg(short, long)]
    key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Outbound mailbox depth per session
    #[arg(long, default_value_t = roomcast_core::config::DEFAULT_MAILBOX_CAPACITY)]
    mailbox_capacity: usize,

    /// Seconds between keepalive probes
    #[arg(long, default_value_t = 54)]
    ping_period_secs: u64,

    /// Seconds to wait for a keepalive acknowledgment
    #[arg(long, default_value_t = 60)]
    pong_wait_secs: u64,

    /// Seconds allowed for a single write
    #[arg(long, default_value_t = 10)]
    write_wait_secs: u64,

    /// Largest inbound frame payload in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,

    /// Room new sessions join ("" to disable)
    #[arg(long, default_value = roomcast_core::config::DEFAULT_LOBBY)]
    lobby: String,

    /// Do not keep or replay room history
    #[arg(long)]
    no_history: bool,

    /// Records kept per room for replay
    #[arg(long, default_value_t = roomcast_core::config::DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,
}

impl Args {
    fn into_config(self) -> ServerRuntimeConfig {
        let session = SessionConfig {
            mailbox_capacity: self.mailbox_capacity,
            ping_period: Duration::from_secs(self.ping_period_secs),
            pong_wait: Duration::from_secs(self.pong_wait_secs),
            write_wait: Duration::from_secs(self.write_wait_secs),
            lobby: Some(self.lobby).filter(|lobby| !lobby.is_empty()),
            ..SessionConfig::default()
        };
        let room = if self.no_history {
            RoomConfig::without_history()
        } else {
            RoomConfig { history: true, history_limit: self.history_limit }
        };

        ServerRuntimeConfig {
            bind_address: self.bind,
            cert_path: self.cert,
            key_path: self.key,
            max_frame_size: self.max_frame_size,
            session,
            room,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Roomcast server starting");
    tracing::info!("Binding to {}", args.bind);

    if args.cert.is_none() || args.key.is_none() {
        tracing::warn!("No TLS certificate provided - using self-signed certificate");
        tracing::warn!("This is NOT suitable for production use!");
    }

    let server = Server::bind(args.into_config())?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    tokio::select! {
        result = server.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(ServerError::from)?;
            tracing::info!("Shutting down");
        },
    }

    Ok(())
}
