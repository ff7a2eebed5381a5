//! Protocol and command parsing errors.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding frames or wire records.
///
/// None of these are fatal to the process. Frame errors terminate the one
/// connection that produced them; record errors drop the one record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer ended before a complete header or payload
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Header claims more payload than the buffer holds
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload bytes claimed by the header
        expected: usize,
        /// Payload bytes available
        actual: usize,
    },

    /// Header does not start with the roomcast magic
    #[error("invalid magic number")]
    InvalidMagic,

    /// Header carries a version this build does not speak
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Opcode byte is not one of the known opcodes
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Payload exceeds the permitted size
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Claimed or actual payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Text payload is not valid UTF-8
    #[error("text payload is not valid UTF-8")]
    InvalidUtf8,

    /// Wire record does not have exactly three fields
    #[error("malformed wire record: expected 3 fields, got {fields}")]
    MalformedRecord {
        /// Number of fields found
        fields: usize,
    },
}

/// Errors produced while parsing a command frame.
///
/// A rejected command never mutates session or room state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Frame does not begin with the command marker
    #[error("not a command frame")]
    NotACommand,

    /// Marker with no verb after it
    #[error("empty command")]
    Empty,

    /// Verb is not recognised
    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    /// Wrong number of arguments for the verb
    #[error("{verb} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// Verb that was invoked
        verb: &'static str,
        /// Arguments required
        expected: usize,
        /// Arguments supplied
        actual: usize,
    },

    /// Display name would corrupt the record encoding
    #[error("invalid display name: {0}")]
    InvalidName(String),

    /// Room name would corrupt the record encoding of room listings
    #[error("invalid room name: {0}")]
    InvalidRoom(String),
}

impl CommandError {
    /// Unknown verbs are inert and are not reported as malformed input.
    pub fn is_unknown_verb(&self) -> bool {
        matches!(self, Self::UnknownVerb(_))
    }
}
