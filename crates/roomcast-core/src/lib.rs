//! Roomcast broker core.
//!
//! Transport-agnostic connection lifecycle and fan-out layer. A connection is
//! handed in as a [`FrameSource`]/[`FrameSink`] pair; everything else lives
//! here.
//!
//! # Components
//!
//! - [`Session`]: one connected peer. Mutable display name, at most one room,
//!   and a bounded [`Mailbox`] drained by the outbound pump.
//! - [`Room`]: named broadcast group. Serializes its own membership, history
//!   and fan-out under one lock.
//! - [`Registry`]: process-wide directory of rooms. Creates rooms on demand
//!   and reclaims them once empty. Its lock covers table mutation only.
//! - [`commands`]: the in-band command interpreter.
//! - [`pump`]: the inbound and outbound pumps and the [`serve`] entry point
//!   that ties a session to its transport.
//!
//! # Locking
//!
//! The registry table lock and a room lock are never held at the same time.
//! A room lock may be held while reading or updating a member's session
//! fields; a session lock is never held while acquiring anything else.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod mailbox;
pub mod pump;
pub mod registry;
pub mod room;
pub mod session;
pub mod transport;

pub use commands::Flow;
pub use config::{RoomConfig, SessionConfig};
pub use env::Environment;
pub use error::{RoomError, SendError, SessionError, TransportError};
pub use mailbox::{Mailbox, MailboxReceiver, Outbound};
pub use pump::{serve, serve_connection};
pub use registry::Registry;
pub use room::{BroadcastReport, Room};
pub use session::{Session, SessionId};
pub use transport::{FrameSink, FrameSource, Inbound};
