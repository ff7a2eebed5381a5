//! Simulated client.
//!
//! A [`SimClient`] is one session served by the real pumps over the in-memory
//! transport. Tests talk to it the way a peer would: send text frames, read
//! back records and control frames.

use std::{sync::Arc, time::Duration};

use roomcast_core::{
    Registry, SessionConfig, SessionError, serve_connection,
    transport::{MemoryPeer, PeerFrame, memory_transport},
};
use roomcast_proto::{HELP_TEXT, ROOM_CHANGE_MARKER, TERMINATION_MARKER, WireRecord};
use tokio::task::JoinHandle;

use crate::SimEnv;

/// How long [`SimClient::is_quiet`] waits before deciding nothing is coming.
const QUIET_WINDOW: Duration = Duration::from_millis(100);

/// A text frame as a client interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// `sender|timestamp|content`
    Record(WireRecord),
    /// `/userRoom <room>`
    RoomChange(String),
    /// `/quit`
    Terminated,
    /// Anything else
    Other(String),
}

impl Received {
    /// Classify a text frame.
    pub fn classify(text: &str) -> Self {
        if text == TERMINATION_MARKER {
            return Self::Terminated;
        }
        if let Some(room) = text.strip_prefix(ROOM_CHANGE_MARKER) {
            return Self::RoomChange(room.trim().to_string());
        }
        match WireRecord::parse(text) {
            Ok(record) => Self::Record(record),
            Err(_) => Self::Other(text.to_string()),
        }
    }
}

/// One simulated peer and the task serving its session.
#[derive(Debug)]
pub struct SimClient {
    peer: MemoryPeer,
    task: JoinHandle<Result<(), SessionError>>,
}

impl SimClient {
    /// Connect a new session to `registry`.
    pub fn connect(registry: &Arc<Registry<SimEnv>>, config: &Arc<SessionConfig>) -> Self {
        let (source, sink, peer) = memory_transport();
        let task =
            tokio::spawn(serve_connection(Arc::clone(registry), Arc::clone(config), source, sink));
        Self { peer, task }
    }

    /// Connect and consume the lobby greeting (room change, replayed
    /// history, arrival notice, usage text) so the next read is whatever
    /// happens afterwards.
    ///
    /// Requires `send_help_on_connect`.
    pub async fn connect_greeted(
        registry: &Arc<Registry<SimEnv>>,
        config: &Arc<SessionConfig>,
    ) -> Self {
        let mut client = Self::connect(registry, config);
        client.expect_content(HELP_TEXT).await;
        client
    }

    /// Send a text frame.
    pub fn say(&self, text: impl Into<String>) {
        self.peer.send_text(text);
    }

    /// The underlying transport peer.
    pub fn peer(&mut self) -> &mut MemoryPeer {
        &mut self.peer
    }

    /// Next text frame, classified. `None` once the broker closed the
    /// connection.
    pub async fn recv(&mut self) -> Option<Received> {
        self.peer.next_text().await.map(|text| Received::classify(&text))
    }

    /// Next wire record, skipping control frames.
    pub async fn next_record(&mut self) -> Option<WireRecord> {
        loop {
            if let Received::Record(record) = self.recv().await? {
                return Some(record);
            }
        }
    }

    /// Read until a frame matching `pred` arrives and return it.
    ///
    /// # Panics
    ///
    /// Panics if the connection closes first.
    #[allow(clippy::panic)]
    pub async fn skip_until(&mut self, pred: impl Fn(&Received) -> bool) -> Received {
        loop {
            match self.recv().await {
                Some(received) if pred(&received) => return received,
                Some(_) => {},
                None => panic!("connection closed before expected frame"),
            }
        }
    }

    /// Read until a record with exactly `content` arrives.
    ///
    /// # Panics
    ///
    /// Panics if the connection closes first.
    #[allow(clippy::panic)]
    pub async fn expect_content(&mut self, content: &str) -> WireRecord {
        match self
            .skip_until(|received| matches!(received, Received::Record(r) if r.content == content))
            .await
        {
            Received::Record(record) => record,
            other => panic!("unexpected frame {other:?}"),
        }
    }

    /// Whether nothing at all arrives within a short window.
    ///
    /// Meant for `start_paused` tests, where the window elapses as soon as
    /// every task is idle.
    pub async fn is_quiet(&mut self) -> bool {
        tokio::time::timeout(QUIET_WINDOW, self.peer.next_frame()).await.is_err()
    }

    /// Read everything up to and including the close indicator.
    pub async fn read_to_close(&mut self) -> Vec<PeerFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.peer.next_frame().await {
            let closed = frame == PeerFrame::Close;
            frames.push(frame);
            if closed {
                break;
            }
        }
        frames
    }

    /// Close the peer side of the connection.
    pub fn hang_up(&mut self) {
        self.peer.hang_up();
    }

    /// Wait for the session task and return how it ended.
    ///
    /// # Panics
    ///
    /// Panics if the session task panicked.
    #[allow(clippy::panic)]
    pub async fn finish(self) -> Result<(), SessionError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => panic!("session task failed: {e}"),
        }
    }
}
