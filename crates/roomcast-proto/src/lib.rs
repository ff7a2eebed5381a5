//! Roomcast wire vocabulary.
//!
//! Three layers live here, none of which perform I/O:
//!
//! - [`WireRecord`]: the `sender|timestamp|content` text record delivered to
//!   room members.
//! - [`Command`]: the in-band command protocol (`/join`, `/name`, ...) parsed
//!   from marker-prefixed text frames, plus the control frames the broker
//!   writes back (`/userRoom <room>`, `/quit`).
//! - [`Frame`]: the binary transport frame (8-byte header + payload) used to
//!   carry text, keepalive probes and close indicators over a byte stream.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod errors;
pub mod frame;
pub mod header;
pub mod record;

pub use command::{
    COMMAND_MARKER, Command, HELP_TEXT, ROOM_CHANGE_MARKER, TERMINATION_MARKER, room_change_frame,
};
pub use errors::{CommandError, ProtocolError, Result};
pub use frame::Frame;
pub use header::{FrameHeader, Opcode};
pub use record::{FIELD_DELIMITER, SERVER_SENDER, WireRecord, format_timestamp};

/// ALPN protocol identifier negotiated by the QUIC transport.
pub const ALPN_PROTOCOL: &[u8] = b"roomcast";
