//! Fuzz target for room membership under arbitrary operation sequences
//!
//! Joins, departures, renames and broadcasts against tiny mailboxes, so
//! eviction fires constantly.
//!
//! # Invariants
//!
//! - A session's room reference points at a room that lists it as a member,
//!   and every member's reference points back
//! - The registry lists a room only while it has members
//! - An evicted session's mailbox is closed

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomcast_core::{Environment, MailboxReceiver, Registry, RoomConfig, Session, commands};
use roomcast_harness::SimEnv;

const SESSIONS: usize = 4;
const ROOMS: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Join { session: u8, room: u8 },
    Leave { session: u8 },
    Rename { session: u8, name: u8 },
    Say { session: u8 },
    Drain { session: u8 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    capacity: u8,
    history: bool,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let env = SimEnv::with_seed(input.seed);
    let config = if input.history { RoomConfig::default() } else { RoomConfig::without_history() };
    let registry = Registry::new(env.clone(), config);
    let capacity = usize::from(input.capacity % 8) + 1;

    let mut sessions: Vec<(Arc<Session<SimEnv>>, MailboxReceiver)> = (0..SESSIONS)
        .map(|i| Session::new(i as u64, format!("user{i}"), capacity, env.now()))
        .collect();

    for op in input.ops.into_iter().take(256) {
        match op {
            Op::Join { session, room } => {
                let (s, _) = &sessions[usize::from(session) % SESSIONS];
                commands::join(s, &registry, ROOMS[usize::from(room) % ROOMS.len()]);
            },
            Op::Leave { session } => sessions[usize::from(session) % SESSIONS].0.detach(),
            Op::Rename { session, name } => {
                sessions[usize::from(session) % SESSIONS].0.rename(format!("n{name}"));
            },
            Op::Say { session } => {
                let (s, _) = &sessions[usize::from(session) % SESSIONS];
                if let Some(room) = s.room() {
                    room.broadcast(&s.name(), "hi");
                }
            },
            Op::Drain { session } => {
                sessions[usize::from(session) % SESSIONS].1.drain();
            },
        }

        for (s, _) in &sessions {
            if let Some(room) = s.room() {
                assert!(room.contains(s.id()));
                assert!(!s.is_closed());
            }
        }
        for name in ROOMS {
            if let Some(room) = registry.room(name) {
                assert!(room.member_count() > 0);
                for id in room.member_ids() {
                    let member = &sessions[id as usize].0;
                    assert!(member.room().is_some_and(|r| Arc::ptr_eq(&r, &room)));
                }
            }
        }
    }
});
