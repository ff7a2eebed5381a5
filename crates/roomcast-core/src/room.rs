//! Named broadcast groups.
//!
//! A room serializes membership changes, history appends and fan-out under
//! one lock, so every member observes the same order of broadcasts and the
//! history always matches what was delivered.
//!
//! Fan-out never waits on a member. A member whose mailbox rejects a record
//! is evicted on the spot and its mailbox closed; the broadcast carries on
//! for everybody else.
//!
//! When membership drops to zero the room retires: it refuses further joins
//! and asks the registry to reclaim it. Retirement is one-way, so a joiner
//! holding a stale handle is told to look the name up again rather than
//! landing in a room nobody can find.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use roomcast_proto::{SERVER_SENDER, WireRecord};

use crate::{
    Environment,
    config::RoomConfig,
    error::RoomError,
    mailbox::Outbound,
    registry::Registry,
    session::{Session, SessionId},
};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members that accepted the record
    pub delivered: usize,
    /// Members evicted because their mailbox was saturated or closed
    pub evicted: Vec<SessionId>,
}

struct RoomInner<E: Environment> {
    members: BTreeMap<SessionId, Arc<Session<E>>>,
    history: VecDeque<Arc<str>>,
}

/// Named broadcast group.
pub struct Room<E: Environment> {
    name: String,
    env: E,
    config: RoomConfig,
    registry: Weak<Registry<E>>,
    this: Weak<Room<E>>,
    retired: AtomicBool,
    inner: Mutex<RoomInner<E>>,
}

impl<E: Environment> Room<E> {
    /// Create an empty room.
    ///
    /// `registry` is notified when the room empties; pass `Weak::new()` for a
    /// standalone room.
    pub fn new(
        name: impl Into<String>,
        env: E,
        config: RoomConfig,
        registry: Weak<Registry<E>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name: name.into(),
            env,
            config,
            registry,
            this: this.clone(),
            retired: AtomicBool::new(false),
            inner: Mutex::new(RoomInner { members: BTreeMap::new(), history: VecDeque::new() }),
        })
    }

    /// Room name (registry key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the room emptied and stopped accepting joins.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Add a member.
    ///
    /// Replays retained history to the joiner (oldest first) and then
    /// broadcasts an arrival notice to every member, joiner included. Both go
    /// through the ordinary mailbox path. Joining twice is a no-op.
    ///
    /// A session still in another room leaves it first (with the usual
    /// departure notice), so it is never a member of two rooms at once.
    ///
    /// # Errors
    ///
    /// - `RoomError::Retired` if the room already emptied; the caller should
    ///   get a fresh room from the registry
    pub fn join(&self, session: &Arc<Session<E>>) -> Result<(), RoomError> {
        if self.is_retired() {
            return Err(RoomError::Retired(self.name.clone()));
        }
        // Outside our lock: leaving takes the other room's lock.
        if session.room().is_some_and(|current| !std::ptr::eq(Arc::as_ptr(&current), self)) {
            session.detach();
        }

        let emptied = {
            let mut inner = self.inner.lock();
            if self.is_retired() {
                return Err(RoomError::Retired(self.name.clone()));
            }
            if inner.members.contains_key(&session.id()) {
                return Ok(());
            }

            inner.members.insert(session.id(), Arc::clone(session));
            session.set_room(self.this.clone());

            let replay_failed = inner
                .history
                .iter()
                .any(|record| session.send(Outbound::Text(Arc::clone(record))).is_err());
            if replay_failed {
                tracing::warn!(room = %self.name, session_id = session.id(), "history replay saturated joiner");
                self.evict_locked(&mut inner, session.id());
            } else {
                let notice = format!("{} joined the room", session.name());
                self.broadcast_locked(&mut inner, SERVER_SENDER, &notice);
            }

            self.retire_if_empty(&inner)
        };

        if emptied {
            self.notify_registry();
        }
        tracing::debug!(room = %self.name, session_id = session.id(), "joined");
        Ok(())
    }

    /// Remove a member and announce the departure to whoever remains.
    ///
    /// Idempotent: removing an absent member changes nothing. Returns whether
    /// the session was a member.
    pub fn leave(&self, session: &Session<E>) -> bool {
        let (removed, emptied) = {
            let mut inner = self.inner.lock();
            if inner.members.remove(&session.id()).is_none() {
                return false;
            }
            session.clear_room_if(&self.this);

            if !inner.members.is_empty() {
                let notice = format!("{} left the room", session.name());
                self.broadcast_locked(&mut inner, SERVER_SENDER, &notice);
            }
            (true, self.retire_if_empty(&inner))
        };

        if emptied {
            self.notify_registry();
        }
        tracing::debug!(room = %self.name, session_id = session.id(), "left");
        removed
    }

    /// Deliver `content` from `sender` to every member, sender included.
    ///
    /// The record is stamped with the server clock, appended to history, and
    /// offered to each mailbox without waiting. Saturated members are evicted.
    pub fn broadcast(&self, sender: &str, content: &str) -> BroadcastReport {
        let (report, emptied) = {
            let mut inner = self.inner.lock();
            let report = self.broadcast_locked(&mut inner, sender, content);
            (report, self.retire_if_empty(&inner))
        };

        if emptied {
            self.notify_registry();
        }
        report
    }

    /// Display names of current members, sorted.
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.inner.lock().members.values().map(|member| member.name()).collect();
        names.sort_unstable();
        names
    }

    /// Ids of current members, ascending.
    pub fn member_ids(&self) -> Vec<SessionId> {
        self.inner.lock().members.keys().copied().collect()
    }

    /// Whether `session_id` is a member.
    pub fn contains(&self, session_id: SessionId) -> bool {
        self.inner.lock().members.contains_key(&session_id)
    }

    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.inner.lock().members.len()
    }

    /// Retained records, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.inner.lock().history.iter().map(|record| record.to_string()).collect()
    }

    fn broadcast_locked(
        &self,
        inner: &mut RoomInner<E>,
        sender: &str,
        content: &str,
    ) -> BroadcastReport {
        let record: Arc<str> = WireRecord::new(sender, self.env.timestamp(), content).encode().into();

        if self.config.history {
            inner.history.push_back(Arc::clone(&record));
            while inner.history.len() > self.config.history_limit {
                inner.history.pop_front();
            }
        }

        let mut report = BroadcastReport::default();
        for (id, member) in &inner.members {
            match member.send(Outbound::Text(Arc::clone(&record))) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(room = %self.name, session_id = id, error = %e, "evicting slow consumer");
                    report.evicted.push(*id);
                },
            }
        }

        for id in &report.evicted {
            self.evict_locked(inner, *id);
        }
        report
    }

    fn evict_locked(&self, inner: &mut RoomInner<E>, session_id: SessionId) {
        if let Some(member) = inner.members.remove(&session_id) {
            member.clear_room_if(&self.this);
            member.close_mailbox();
        }
    }

    /// Mark the room retired if it just became empty. Returns `true` exactly
    /// once per room.
    fn retire_if_empty(&self, inner: &RoomInner<E>) -> bool {
        inner.members.is_empty() && !self.retired.swap(true, Ordering::AcqRel)
    }

    fn notify_registry(&self) {
        tracing::debug!(room = %self.name, "room empty");
        if let Some(registry) = self.registry.upgrade() {
            registry.reclaim(&self.name);
        }
    }
}

impl<E: Environment> std::fmt::Debug for Room<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("name", &self.name)
            .field("members", &self.member_count())
            .field("retired", &self.is_retired())
            .finish_non_exhaustive()
    }
}
