//! Bounded per-session outbound queue.
//!
//! Producers (room fan-out, command replies) only ever use the non-blocking
//! [`Mailbox::try_send`]. A full mailbox means the session is not keeping up
//! and the producer decides what to do about it; it never waits.
//!
//! Closing is explicit and idempotent: the sending half is dropped, the
//! outbound pump drains what is left and then sees the end of the stream.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::error::SendError;

/// One item queued for the outbound pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Text frame (wire record or control frame)
    Text(Arc<str>),
    /// Acknowledgment of a peer keepalive probe
    Pong,
}

impl Outbound {
    /// Text frame from anything string-like.
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Self::Text(text.into())
    }
}

/// Sending half, owned by the session.
#[derive(Debug)]
pub struct Mailbox {
    tx: Mutex<Option<mpsc::Sender<Outbound>>>,
}

/// Receiving half, owned by the outbound pump.
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: mpsc::Receiver<Outbound>,
}

impl Mailbox {
    /// Create a mailbox holding at most `capacity` items (minimum 1).
    pub fn channel(capacity: usize) -> (Self, MailboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Mutex::new(Some(tx)) }, MailboxReceiver { rx })
    }

    /// Enqueue without waiting.
    ///
    /// # Errors
    ///
    /// - `SendError::Saturated` if the mailbox is full
    /// - `SendError::Closed` if the mailbox was closed or the pump is gone
    pub fn try_send(&self, item: Outbound) -> Result<(), SendError> {
        let guard = self.tx.lock();
        let tx = guard.as_ref().ok_or(SendError::Closed)?;
        tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Saturated,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Close the mailbox. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.tx.lock().take().is_some()
    }

    /// Whether [`Mailbox::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl MailboxReceiver {
    /// Wait for the next item. `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.rx.recv().await
    }

    /// Next item if one is already queued.
    pub fn try_recv(&mut self) -> Option<Outbound> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drain everything currently queued.
    pub fn drain(&mut self) -> Vec<Outbound> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_in_order() {
        let (mailbox, mut rx) = Mailbox::channel(8);
        for i in 0..3 {
            mailbox.try_send(Outbound::text(format!("msg_{i}"))).unwrap();
        }
        for i in 0..3 {
            assert_eq!(rx.recv().await, Some(Outbound::text(format!("msg_{i}"))));
        }
    }

    #[test]
    fn full_mailbox_is_saturated() {
        let (mailbox, _rx) = Mailbox::channel(1);
        assert_eq!(mailbox.try_send(Outbound::Pong), Ok(()));
        assert_eq!(mailbox.try_send(Outbound::Pong), Err(SendError::Saturated));
    }

    #[test]
    fn zero_capacity_rounds_up() {
        let (mailbox, _rx) = Mailbox::channel(0);
        assert_eq!(mailbox.try_send(Outbound::Pong), Ok(()));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_drains() {
        let (mailbox, mut rx) = Mailbox::channel(4);
        mailbox.try_send(Outbound::text("last words")).unwrap();

        assert!(mailbox.close());
        assert!(!mailbox.close());
        assert!(mailbox.is_closed());
        assert_eq!(mailbox.try_send(Outbound::Pong), Err(SendError::Closed));

        assert_eq!(rx.recv().await, Some(Outbound::text("last words")));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (mailbox, rx) = Mailbox::channel(4);
        drop(rx);
        assert_eq!(mailbox.try_send(Outbound::Pong), Err(SendError::Closed));
    }

    #[test]
    fn drain_takes_everything_queued() {
        let (mailbox, mut rx) = Mailbox::channel(4);
        mailbox.try_send(Outbound::text("a")).unwrap();
        mailbox.try_send(Outbound::Pong).unwrap();
        assert_eq!(rx.drain(), vec![Outbound::text("a"), Outbound::Pong]);
        assert!(rx.try_recv().is_none());
    }
}
