//! In-memory transport.
//!
//! Connects a session's pumps to a [`MemoryPeer`] through unbounded channels.
//! The peer can inject read failures and make writes fail or stall, which is
//! enough to drive every teardown path without sockets.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{FrameSink, FrameSource, Inbound};
use crate::{error::TransportError, mailbox::Outbound};

/// A frame as the peer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerFrame {
    /// Text frame
    Text(String),
    /// Keepalive probe from the broker
    Ping,
    /// Answer to a peer probe
    Pong,
    /// Close indicator
    Close,
}

#[derive(Debug, Default)]
struct WriteControl {
    fail: AtomicBool,
    stall: AtomicBool,
}

/// Read half handed to the inbound pump.
#[derive(Debug)]
pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<Result<Inbound, TransportError>>,
}

/// Write half handed to the outbound pump.
#[derive(Debug)]
pub struct MemorySink {
    tx: mpsc::UnboundedSender<Vec<PeerFrame>>,
    control: Arc<WriteControl>,
}

/// The far end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    to_broker: Option<mpsc::UnboundedSender<Result<Inbound, TransportError>>>,
    from_broker: mpsc::UnboundedReceiver<Vec<PeerFrame>>,
    pending: std::collections::VecDeque<PeerFrame>,
    control: Arc<WriteControl>,
}

/// Create a connected source/sink pair and the peer driving them.
pub fn memory_transport() -> (MemorySource, MemorySink, MemoryPeer) {
    let (to_broker, rx) = mpsc::unbounded_channel();
    let (tx, from_broker) = mpsc::unbounded_channel();
    let control = Arc::new(WriteControl::default());

    let source = MemorySource { rx };
    let sink = MemorySink { tx, control: Arc::clone(&control) };
    let peer = MemoryPeer {
        to_broker: Some(to_broker),
        from_broker,
        pending: std::collections::VecDeque::new(),
        control,
    };
    (source, sink, peer)
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        self.rx.recv().await.transpose()
    }
}

impl MemorySink {
    async fn write(&mut self, frames: Vec<PeerFrame>) -> Result<(), TransportError> {
        if self.control.stall.load(Ordering::Relaxed) {
            std::future::pending::<()>().await;
        }
        if self.control.fail.load(Ordering::Relaxed) {
            return Err(TransportError::Io("injected write failure".to_string()));
        }
        self.tx.send(frames).map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send_batch(&mut self, batch: &[Outbound]) -> Result<(), TransportError> {
        let frames = batch
            .iter()
            .map(|item| match item {
                Outbound::Text(text) => PeerFrame::Text(text.to_string()),
                Outbound::Pong => PeerFrame::Pong,
            })
            .collect();
        self.write(frames).await
    }

    async fn ping(&mut self) -> Result<(), TransportError> {
        self.write(vec![PeerFrame::Ping]).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.write(vec![PeerFrame::Close]).await
    }
}

impl MemoryPeer {
    fn deliver(&self, item: Result<Inbound, TransportError>) {
        if let Some(tx) = &self.to_broker {
            // Receiver gone means the inbound pump already stopped.
            let _ = tx.send(item);
        }
    }

    /// Send a text frame to the broker.
    pub fn send_text(&self, text: impl Into<String>) {
        self.deliver(Ok(Inbound::Text(text.into())));
    }

    /// Send a keepalive probe to the broker.
    pub fn send_ping(&self) {
        self.deliver(Ok(Inbound::Ping));
    }

    /// Acknowledge a broker probe.
    pub fn send_pong(&self) {
        self.deliver(Ok(Inbound::Pong));
    }

    /// Make the broker's next read fail.
    pub fn fail_read(&self) {
        self.deliver(Err(TransportError::Io("injected read failure".to_string())));
    }

    /// Close the peer's write side; the broker reads an orderly end.
    pub fn hang_up(&mut self) {
        self.to_broker = None;
    }

    /// Make every subsequent broker write fail.
    pub fn fail_writes(&self) {
        self.control.fail.store(true, Ordering::Relaxed);
    }

    /// Make every subsequent broker write hang forever.
    pub fn stall_writes(&self) {
        self.control.stall.store(true, Ordering::Relaxed);
    }

    /// Next batch as written by the outbound pump. `None` once the sink is
    /// gone.
    pub async fn next_batch(&mut self) -> Option<Vec<PeerFrame>> {
        if !self.pending.is_empty() {
            return Some(self.pending.drain(..).collect());
        }
        self.from_broker.recv().await
    }

    /// Next frame, regardless of batching.
    pub async fn next_frame(&mut self) -> Option<PeerFrame> {
        while self.pending.is_empty() {
            let batch = self.from_broker.recv().await?;
            self.pending.extend(batch);
        }
        self.pending.pop_front()
    }

    /// Next text frame, skipping keepalive traffic. `None` on close.
    pub async fn next_text(&mut self) -> Option<String> {
        loop {
            match self.next_frame().await? {
                PeerFrame::Text(text) => return Some(text),
                PeerFrame::Close => return None,
                PeerFrame::Ping | PeerFrame::Pong => {},
            }
        }
    }

    /// Every frame already written, without waiting.
    pub fn drain(&mut self) -> Vec<PeerFrame> {
        while let Ok(batch) = self.from_broker.try_recv() {
            self.pending.extend(batch);
        }
        self.pending.drain(..).collect()
    }
}
