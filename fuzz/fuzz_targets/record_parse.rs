//! Fuzz target for WireRecord::parse
//!
//! Parsing never panics, succeeds exactly for three-field input, and a parsed
//! record encodes back to its input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomcast_proto::{FIELD_DELIMITER, ProtocolError, WireRecord};

fuzz_target!(|input: &str| {
    let fields = input.split(FIELD_DELIMITER).count();
    match WireRecord::parse(input) {
        Ok(record) => {
            assert_eq!(fields, 3);
            assert_eq!(record.encode(), input);
        },
        Err(e) => assert_eq!(e, ProtocolError::MalformedRecord { fields }),
    }
});
