//! Fuzz target for frame header boundary conditions
//!
//! # Invariants
//!
//! - Wrong magic MUST return `ProtocolError::InvalidMagic`
//! - Unknown versions MUST return `ProtocolError::UnsupportedVersion`
//! - `payload_size > MAX_PAYLOAD_SIZE` MUST return
//!   `ProtocolError::PayloadTooLarge`
//! - A valid header with a short payload MUST return
//!   `ProtocolError::FrameTruncated`

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomcast_proto::{Frame, FrameHeader, Opcode, ProtocolError};

#[derive(Debug, Clone, Arbitrary)]
enum PayloadSize {
    Exact,
    Zero,
    AtMax,
    JustOverMax,
    Max,
    Random(u32),
}

#[derive(Debug, Clone, Arbitrary)]
struct BoundaryFrame {
    valid_magic: bool,
    magic: [u8; 2],
    version: u8,
    opcode: u8,
    payload_size: PayloadSize,
    payload: Vec<u8>,
}

fuzz_target!(|input: BoundaryFrame| {
    let magic = if input.valid_magic { FrameHeader::MAGIC.to_be_bytes() } else { input.magic };
    let claimed = match input.payload_size {
        PayloadSize::Exact => input.payload.len() as u32,
        PayloadSize::Zero => 0,
        PayloadSize::AtMax => FrameHeader::MAX_PAYLOAD_SIZE,
        PayloadSize::JustOverMax => FrameHeader::MAX_PAYLOAD_SIZE + 1,
        PayloadSize::Max => u32::MAX,
        PayloadSize::Random(size) => size,
    };

    let mut bytes = Vec::with_capacity(FrameHeader::SIZE + input.payload.len());
    bytes.extend_from_slice(&magic);
    bytes.push(input.version);
    bytes.push(input.opcode);
    bytes.extend_from_slice(&claimed.to_be_bytes());
    bytes.extend_from_slice(&input.payload);

    let result = Frame::decode(&bytes);

    if u16::from_be_bytes(magic) != FrameHeader::MAGIC {
        assert_eq!(result, Err(ProtocolError::InvalidMagic));
        return;
    }
    if input.version != FrameHeader::VERSION {
        assert_eq!(result, Err(ProtocolError::UnsupportedVersion(input.version)));
        return;
    }
    if Opcode::from_u8(input.opcode).is_none() {
        assert_eq!(result, Err(ProtocolError::UnknownOpcode(input.opcode)));
        return;
    }
    if claimed > FrameHeader::MAX_PAYLOAD_SIZE {
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge { .. })));
        return;
    }
    if (claimed as usize) > input.payload.len() {
        assert!(matches!(result, Err(ProtocolError::FrameTruncated { .. })));
        return;
    }

    let frame = result.unwrap();
    assert_eq!(frame.payload.len(), claimed as usize);
    assert_eq!(frame.encoded_len(), FrameHeader::SIZE + claimed as usize);
});
