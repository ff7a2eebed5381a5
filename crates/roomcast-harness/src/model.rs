//! Reference model of room membership.
//!
//! Sessions and rooms are small integers so proptest can generate dense
//! operation sequences. The model applies the same rules as the broker: a
//! session is in at most one room, joining moves it, and a room exists exactly
//! while it has members.

use std::collections::{BTreeMap, BTreeSet};

/// One membership operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOp {
    /// Session moves into room
    Join {
        /// Session index
        session: usize,
        /// Room index
        room: usize,
    },
    /// Session leaves whatever room it is in
    Leave {
        /// Session index
        session: usize,
    },
}

/// Expected membership after a sequence of operations.
#[derive(Debug, Clone, Default)]
pub struct MembershipModel {
    rooms: BTreeMap<usize, BTreeSet<usize>>,
    location: BTreeMap<usize, usize>,
}

impl MembershipModel {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Room name used for room index `room`.
    pub fn room_name(room: usize) -> String {
        format!("room-{room}")
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: MembershipOp) {
        match op {
            MembershipOp::Join { session, room } => {
                if self.location.get(&session) == Some(&room) {
                    return;
                }
                self.remove(session);
                self.rooms.entry(room).or_default().insert(session);
                self.location.insert(session, room);
            },
            MembershipOp::Leave { session } => self.remove(session),
        }
    }

    fn remove(&mut self, session: usize) {
        let Some(room) = self.location.remove(&session) else {
            return;
        };
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&session);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
    }

    /// Members of room index `room`.
    pub fn members(&self, room: usize) -> BTreeSet<usize> {
        self.rooms.get(&room).cloned().unwrap_or_default()
    }

    /// Room the session is in.
    pub fn room_of(&self, session: usize) -> Option<usize> {
        self.location.get(&session).copied()
    }

    /// Names of rooms that currently exist, sorted as the registry sorts them.
    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.keys().map(|room| Self::room_name(*room)).collect();
        names.sort_unstable();
        names
    }
}
