//! Transport frame header with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 8-byte structure serialized as raw binary
//! (Big Endian). A reader pulls exactly [`FrameHeader::SIZE`] bytes off the
//! stream, validates them, and then knows how many payload bytes follow.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Transport frame kinds.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// UTF-8 text frame (chat text, command, wire record or control frame)
    Text = 0x01,
    /// Keepalive probe
    Ping = 0x02,
    /// Keepalive acknowledgment
    Pong = 0x03,
    /// Orderly close indicator, sent last
    Close = 0x04,
}

impl Opcode {
    /// Raw opcode byte.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse an opcode byte. `None` if unrecognized.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Text),
            0x02 => Some(Self::Ping),
            0x03 => Some(Self::Pong),
            0x04 => Some(Self::Close),
            _ => None,
        }
    }
}

/// Fixed 8-byte frame header (Big Endian network byte order)
///
/// Layout: `magic (2) | version (1) | opcode (1) | payload_size (4)`.
///
/// # Security
///
/// The `#[repr(C, packed)]` layout with zerocopy traits means any 8 bytes can
/// be cast to a header without undefined behavior. [`FrameHeader::from_bytes`]
/// then rejects wrong magic, unknown versions and oversized payload claims
/// before any payload memory is allocated.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 2], // "RC"
    version: u8,
    pub(crate) opcode: u8,
    pub(crate) payload_size: [u8; 4],
}

impl FrameHeader {
    /// Size of the serialized header
    pub const SIZE: usize = 8;

    /// Magic number: "RC" in ASCII
    pub const MAGIC: u16 = 0x5243;

    /// Current protocol version
    pub const VERSION: u8 = 0x01;

    /// Hard ceiling on payload size (64 KiB). Transports may enforce a
    /// tighter per-connection limit.
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Create a new header with the specified opcode and an empty payload.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            opcode: opcode.to_u8(),
            payload_size: [0; 4],
        }
    }

    /// Parse header from network bytes (zero-copy, safe)
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if buffer is shorter than 8 bytes
    /// - `ProtocolError::InvalidMagic` if magic number is invalid
    /// - `ProtocolError::UnsupportedVersion` if protocol version is unsupported
    /// - `ProtocolError::UnknownOpcode` if the opcode byte is unknown
    /// - `ProtocolError::PayloadTooLarge` if payload size exceeds maximum
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        if u16::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        if Opcode::from_u8(header.opcode).is_none() {
            return Err(ProtocolError::UnknownOpcode(header.opcode));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize header to bytes (zero-copy)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Opcode as enum. `None` only for headers that bypassed validation.
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("version", &self.version)
            .field("opcode", &self.opcode())
            .field("payload_size", &self.payload_size())
            .finish()
    }
}

// Manual PartialEq implementation (can't derive due to packed repr)
impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}
