//! Process-wide room directory.
//!
//! The registry maps room names to rooms, creating them on first reference
//! and dropping them once they empty. Its lock covers table lookups, inserts
//! and deletes only. It is never held across a room operation, so traffic in
//! one room cannot stall joins or lookups for another.
//!
//! The registry is an explicit object owned by the entry point and passed to
//! whatever needs it; there is no global instance.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

use crate::{Environment, config::RoomConfig, error::RoomError, room::Room, session::Session};

/// Directory of active rooms.
pub struct Registry<E: Environment> {
    env: E,
    config: RoomConfig,
    this: Weak<Registry<E>>,
    rooms: Mutex<HashMap<String, Arc<Room<E>>>>,
}

impl<E: Environment> Registry<E> {
    /// Create an empty registry.
    pub fn new(env: E, config: RoomConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            env,
            config,
            this: this.clone(),
            rooms: Mutex::new(HashMap::new()),
        })
    }

    /// Environment shared with every room.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Room configuration applied to new rooms.
    pub fn room_config(&self) -> &RoomConfig {
        &self.config
    }

    /// Existing room for `name`, or a freshly inserted empty one.
    ///
    /// Lookup and insert happen under one lock acquisition, so concurrent
    /// callers for the same name all get the same instance. A retired entry
    /// still in the table is replaced.
    ///
    /// A room returned here is mid-creation until someone joins it; it is
    /// reclaimed once its last member leaves. Prefer [`Registry::join`],
    /// which creates and occupies the room in one step.
    pub fn get_or_create(&self, name: &str) -> Arc<Room<E>> {
        let mut rooms = self.rooms.lock();
        if let Some(room) = rooms.get(name).filter(|room| !room.is_retired()) {
            return Arc::clone(room);
        }

        let room = Room::new(name, self.env.clone(), self.config.clone(), self.this.clone());
        rooms.insert(name.to_string(), Arc::clone(&room));
        tracing::debug!(room = name, "room created");
        room
    }

    /// Put `session` into the room called `name`, creating it if needed.
    ///
    /// The session leaves whatever room it was in first. Retries if the room
    /// it found retires before the join lands.
    pub fn join(&self, name: &str, session: &Arc<Session<E>>) -> Arc<Room<E>> {
        loop {
            let room = self.get_or_create(name);
            match room.join(session) {
                Ok(()) => return room,
                Err(RoomError::Retired(_)) => {
                    tracing::debug!(room = name, "room retired during join, retrying");
                },
            }
        }
    }

    /// Remove `name` if its room has emptied.
    ///
    /// No-op if the entry is already gone or the room has members. Returns
    /// whether an entry was removed.
    pub fn reclaim(&self, name: &str) -> bool {
        let mut rooms = self.rooms.lock();
        if rooms.get(name).is_some_and(|room| room.is_retired()) {
            rooms.remove(name);
            tracing::debug!(room = name, "room reclaimed");
            return true;
        }
        false
    }

    /// Room registered under `name`, if any.
    pub fn room(&self, name: &str) -> Option<Arc<Room<E>>> {
        self.rooms.lock().get(name).filter(|room| !room.is_retired()).cloned()
    }

    /// Names of all registered rooms, sorted.
    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rooms
            .lock()
            .iter()
            .filter(|(_, room)| !room.is_retired())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of registered rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.lock().values().filter(|room| !room.is_retired()).count()
    }
}

impl<E: Environment> std::fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("rooms", &self.room_names()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestEnv, session};

    #[test]
    fn get_or_create_returns_same_instance() {
        let registry = Registry::new(TestEnv, RoomConfig::default());
        let first = registry.get_or_create("alpha");
        let second = registry.get_or_create("alpha");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn last_leave_reclaims_room() {
        let registry = Registry::new(TestEnv, RoomConfig::default());
        let (a, _rx) = session(1, "alice", 16);
        let old = registry.join("alpha", &a);
        assert_eq!(registry.room_names(), vec!["alpha"]);

        a.detach();
        assert!(registry.room("alpha").is_none());
        assert_eq!(registry.room_count(), 0);

        let fresh = registry.get_or_create("alpha");
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert_eq!(fresh.member_count(), 0);
        assert!(fresh.history().is_empty());
    }

    #[test]
    fn reclaim_ignores_occupied_rooms() {
        let registry = Registry::new(TestEnv, RoomConfig::default());
        let (a, _rx) = session(1, "alice", 16);
        registry.join("alpha", &a);

        assert!(!registry.reclaim("alpha"));
        assert!(!registry.reclaim("missing"));
        assert!(registry.room("alpha").is_some());
    }

    #[test]
    fn join_through_stale_handle_gets_fresh_room() {
        let registry = Registry::new(TestEnv, RoomConfig::default());
        let (a, _rx_a) = session(1, "alice", 16);
        let stale = registry.join("alpha", &a);
        a.detach();

        let (b, _rx_b) = session(2, "bob", 16);
        assert!(stale.join(&b).is_err());

        let room = registry.join("alpha", &b);
        assert!(!Arc::ptr_eq(&stale, &room));
        assert!(room.contains(2));
        assert!(registry.room("alpha").is_some_and(|r| Arc::ptr_eq(&r, &room)));
    }

    #[test]
    fn room_names_sorted_and_occupied_only() {
        let registry = Registry::new(TestEnv, RoomConfig::default());
        let (a, _rx_a) = session(1, "alice", 16);
        let (b, _rx_b) = session(2, "bob", 16);
        registry.join("zulu", &a);
        registry.join("alpha", &b);

        assert_eq!(registry.room_names(), vec!["alpha", "zulu"]);

        b.detach();
        assert_eq!(registry.room_names(), vec!["zulu"]);
    }

    #[test]
    fn join_moves_session_out_of_previous_room() {
        let registry = Registry::new(TestEnv, RoomConfig::default());
        let (a, _rx) = session(1, "alice", 16);
        registry.join("alpha", &a);
        let bravo = registry.join("bravo", &a);

        assert!(registry.room("alpha").is_none());
        assert!(bravo.contains(1));
        assert_eq!(registry.room_names(), vec!["bravo"]);

        a.detach();
        assert_eq!(registry.room_count(), 0);
    }
}
