//! Frame type combining header and payload.
//!
//! Layout on the wire: `[FrameHeader: 8 bytes] + [payload: variable bytes]`.
//! Text frames carry UTF-8; keepalive and close frames carry no payload.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// Complete transport frame.
///
/// # Invariants
///
/// - `payload.len()` matches `header.payload_size()`. Enforced by
///   [`Frame::new`] and verified by [`Frame::decode`].
/// - `payload.len()` does not exceed [`FrameHeader::MAX_PAYLOAD_SIZE`] on the
///   wire. Oversized frames are rejected by [`Frame::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header
    pub header: FrameHeader,

    /// Raw payload bytes
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame with automatic payload_size calculation.
    ///
    /// Payloads longer than `u32::MAX` saturate the size field and are then
    /// rejected by [`Frame::encode`].
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let payload_len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        header.payload_size = payload_len.to_be_bytes();
        Self { header, payload }
    }

    /// Text frame.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(FrameHeader::new(Opcode::Text), Bytes::from(text.into()))
    }

    /// Keepalive probe.
    #[must_use]
    pub fn ping() -> Self {
        Self::new(FrameHeader::new(Opcode::Ping), Bytes::new())
    }

    /// Keepalive acknowledgment.
    #[must_use]
    pub fn pong() -> Self {
        Self::new(FrameHeader::new(Opcode::Pong), Bytes::new())
    }

    /// Close indicator.
    #[must_use]
    pub fn close() -> Self {
        Self::new(FrameHeader::new(Opcode::Close), Bytes::new())
    }

    /// Frame opcode.
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        self.header.opcode()
    }

    /// Borrow the payload as UTF-8 text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidUtf8` if the payload is not UTF-8
    pub fn as_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.payload).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Encode frame into buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if payload exceeds
    ///   [`FrameHeader::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode one frame from the front of `bytes`.
    ///
    /// Trailing bytes after the frame are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError` if header parsing fails
    /// - `ProtocolError::FrameTruncated` if the payload is shorter than the
    ///   header claims
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        let payload = bytes.get(FrameHeader::SIZE..total_size).ok_or(
            ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            },
        )?;

        Ok(Self { header: *header, payload: Bytes::copy_from_slice(payload) })
    }
}
