//! Fuzz target for Frame::decode
//!
//! Arbitrary bytes must never panic the decoder. Anything it accepts must
//! re-encode to exactly the bytes it consumed.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomcast_proto::Frame;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = Frame::decode(data) {
        let mut buf = Vec::new();
        frame.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &data[..frame.encoded_len()]);
    }
});
