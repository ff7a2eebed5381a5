//! Transport seam.
//!
//! The broker consumes an already-established, framed, bidirectional channel
//! per session, split into a read half ([`FrameSource`]) owned by the inbound
//! pump and a write half ([`FrameSink`]) owned by the outbound pump.
//! Handshakes and byte-level framing belong to the implementation.
//!
//! [`memory`] provides an in-process implementation for tests.

pub mod memory;

use async_trait::async_trait;

use crate::{error::TransportError, mailbox::Outbound};

pub use memory::{MemoryPeer, MemorySink, MemorySource, PeerFrame, memory_transport};

/// A frame delivered by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text frame
    Text(String),
    /// Peer keepalive probe; answered with a pong
    Ping,
    /// Acknowledgment of our keepalive probe
    Pong,
}

/// Read half of a connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame from the peer.
    ///
    /// `Ok(None)` means the peer closed the channel in an orderly way.
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError>;
}

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write every item as one batch.
    async fn send_batch(&mut self, batch: &[Outbound]) -> Result<(), TransportError>;

    /// Write a keepalive probe.
    async fn ping(&mut self) -> Result<(), TransportError>;

    /// Write the close indicator and finish the write half.
    async fn close(&mut self) -> Result<(), TransportError>;
}
