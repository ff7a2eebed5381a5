//! Error types for the broker core.
//!
//! Every error here is scoped to one connection or one member. Nothing in this
//! module is fatal to a room, the registry, or the process.

use std::time::Duration;

use roomcast_proto::ProtocolError;
use thiserror::Error;

/// Read/write failure on a connection. Fatal to that connection only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Peer or local side closed the channel
    #[error("connection closed")]
    Closed,

    /// Underlying I/O failure
    #[error("i/o error: {0}")]
    Io(String),

    /// Peer sent bytes that are not a valid frame
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Inbound frame larger than the connection's read limit
    #[error("frame of {size} bytes exceeds read limit of {max}")]
    FrameTooLarge {
        /// Claimed frame size
        size: usize,
        /// Configured limit
        max: usize,
    },
}

/// Non-blocking mailbox enqueue failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Mailbox is full; the session is not keeping up
    #[error("mailbox saturated")]
    Saturated,

    /// Mailbox was closed by session shutdown or eviction
    #[error("mailbox closed")]
    Closed,
}

/// Room operation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Room emptied and was handed back to the registry; look it up again
    #[error("room retired: {0}")]
    Retired(String),
}

/// Why a session's pumps stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transport read or write failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No keepalive acknowledgment within the read deadline
    #[error("read deadline of {0:?} exceeded")]
    ReadTimeout(Duration),

    /// A write did not complete within the write deadline
    #[error("write deadline of {0:?} exceeded")]
    WriteTimeout(Duration),

    /// The outbound pump task panicked or was cancelled
    #[error("outbound pump aborted: {0}")]
    Aborted(String),
}

impl SessionError {
    /// Deadline violations, as opposed to hard transport failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout(_) | Self::WriteTimeout(_))
    }
}
