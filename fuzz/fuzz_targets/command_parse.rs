//! Fuzz target for Command::parse
//!
//! Parsing never panics. Accepted commands carry well-formed arguments: a
//! single non-empty token with no record delimiter in it.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomcast_proto::{Command, FIELD_DELIMITER};

fuzz_target!(|input: &str| {
    let Ok(command) = Command::parse(input) else {
        return;
    };
    assert!(Command::is_command(input));

    match command {
        Command::Join { room } => {
            assert!(!room.is_empty());
            assert!(!room.contains(char::is_whitespace));
            assert!(!room.contains(FIELD_DELIMITER));
        },
        Command::Name { name } => {
            assert!(!name.is_empty());
            assert!(!name.contains(char::is_whitespace));
            assert!(!name.contains(FIELD_DELIMITER));
        },
        Command::Rooms | Command::Users | Command::Help | Command::Quit => {},
    }
});
