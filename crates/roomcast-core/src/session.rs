//! Connected peer state.
//!
//! A session owns its mailbox and two pieces of mutable state: the display
//! name and a weak reference to the room it is in. Both live behind the
//! session's own lock, which is only ever held for the duration of a field
//! read or write.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use roomcast_proto::{SERVER_SENDER, WireRecord};

use crate::{
    Environment,
    error::SendError,
    mailbox::{Mailbox, MailboxReceiver, Outbound},
    room::Room,
};

/// Session identifier.
///
/// Drawn from the environment's RNG per connection, so uniqueness is
/// probabilistic rather than guaranteed. Rooms key their members on it.
pub type SessionId = u64;

struct SessionState<E: Environment> {
    name: String,
    room: Option<Weak<Room<E>>>,
}

/// One connected peer.
pub struct Session<E: Environment> {
    id: SessionId,
    state: Mutex<SessionState<E>>,
    mailbox: Mailbox,
    connected_at: E::Instant,
}

impl<E: Environment> Session<E> {
    /// Create a session with an empty room reference.
    ///
    /// The returned receiver belongs to the outbound pump.
    pub fn new(
        id: SessionId,
        name: impl Into<String>,
        mailbox_capacity: usize,
        connected_at: E::Instant,
    ) -> (Arc<Self>, MailboxReceiver) {
        let (mailbox, rx) = Mailbox::channel(mailbox_capacity);
        let session = Arc::new(Self {
            id,
            state: Mutex::new(SessionState { name: name.into(), room: None }),
            mailbox,
            connected_at,
        });
        (session, rx)
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// When the session was accepted.
    pub fn connected_at(&self) -> E::Instant {
        self.connected_at
    }

    /// Current display name (snapshot).
    pub fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    /// Replace the display name, returning the previous one.
    pub fn rename(&self, name: impl Into<String>) -> String {
        std::mem::replace(&mut self.state.lock().name, name.into())
    }

    /// Room the session is currently in, if it still exists.
    pub fn room(&self) -> Option<Arc<Room<E>>> {
        self.state.lock().room.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_room(&self, room: Weak<Room<E>>) {
        self.state.lock().room = Some(room);
    }

    /// Clear the room reference if it still points at `room`.
    pub(crate) fn clear_room_if(&self, room: &Weak<Room<E>>) {
        let mut state = self.state.lock();
        if state.room.as_ref().is_some_and(|current| current.ptr_eq(room)) {
            state.room = None;
        }
    }

    fn take_room(&self) -> Option<Arc<Room<E>>> {
        self.state.lock().room.take().and_then(|room| room.upgrade())
    }

    /// Enqueue an outbound item without blocking.
    ///
    /// # Errors
    ///
    /// - `SendError::Saturated` if the mailbox is full
    /// - `SendError::Closed` if the session is shutting down
    pub fn send(&self, item: Outbound) -> Result<(), SendError> {
        self.mailbox.try_send(item)
    }

    /// Enqueue a raw text frame (wire record or control frame).
    pub fn send_text(&self, text: impl Into<Arc<str>>) -> Result<(), SendError> {
        self.send(Outbound::Text(text.into()))
    }

    /// Reply to this session only with a notice from the server.
    ///
    /// Delivery failures are logged; a reply is never worth more than that.
    pub fn notify(&self, env: &E, content: &str) {
        let record = WireRecord::new(SERVER_SENDER, env.timestamp(), content);
        if let Err(e) = self.send_text(record.encode()) {
            tracing::debug!(session_id = self.id, error = %e, "reply dropped");
        }
    }

    /// Close the mailbox. Returns `false` if it was already closed.
    pub fn close_mailbox(&self) -> bool {
        self.mailbox.close()
    }

    /// Whether the mailbox has been closed.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Leave the current room, if any, announcing the departure.
    ///
    /// Idempotent: the room reference is taken under the session lock, so
    /// racing callers see it at most once and the room's own leave is a no-op
    /// for absent members.
    pub fn detach(&self) {
        if let Some(room) = self.take_room() {
            room.leave(self);
        }
    }

    /// Detach and close the mailbox. Safe to call from every teardown path.
    pub fn shutdown(&self) {
        self.detach();
        if self.close_mailbox() {
            tracing::debug!(session_id = self.id, "mailbox closed");
        }
    }
}

impl<E: Environment> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
