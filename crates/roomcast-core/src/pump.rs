//! Per-session pumps.
//!
//! Every session runs two flows that share only the mailbox and the session's
//! lock-guarded fields:
//!
//! - the inbound pump reads frames from the [`FrameSource`] and dispatches
//!   them (commands to the interpreter, everything else to the current room)
//! - the outbound pump drains the mailbox into the [`FrameSink`] and sends a
//!   keepalive probe every `ping_period`
//!
//! Either pump stopping tears the whole session down. The read deadline is
//! pushed forward on every keepalive acknowledgment; each write has its own
//! deadline. Violating either is fatal to this session only.

use std::{future::Future, sync::Arc, time::Duration};

use roomcast_proto::Command;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout, timeout_at};

use crate::{
    Environment,
    commands::{self, Flow},
    config::SessionConfig,
    error::{SessionError, TransportError},
    mailbox::{MailboxReceiver, Outbound},
    registry::Registry,
    session::Session,
    transport::{FrameSink, FrameSource, Inbound},
};

/// Create a session for a freshly accepted connection and serve it until it
/// ends.
///
/// The session gets a random id, the configured default name and the
/// configured mailbox capacity.
pub async fn serve_connection<E, R, W>(
    registry: Arc<Registry<E>>,
    config: Arc<SessionConfig>,
    source: R,
    sink: W,
) -> Result<(), SessionError>
where
    E: Environment,
    R: FrameSource,
    W: FrameSink,
{
    let env = registry.env();
    let (session, mailbox) = Session::new(
        env.random_u64(),
        config.default_name.as_str(),
        config.mailbox_capacity,
        env.now(),
    );
    tracing::debug!(session_id = session.id(), "session accepted");
    serve(session, mailbox, source, sink, registry, config).await
}

/// Run both pumps for `session` until either stops, then tear down.
///
/// Teardown detaches the session from its room and closes its mailbox, which
/// lets the outbound pump flush what is queued and write the close indicator.
/// Returns why the session ended; an orderly close or `quit` is `Ok`.
pub async fn serve<E, R, W>(
    session: Arc<Session<E>>,
    mailbox: MailboxReceiver,
    mut source: R,
    sink: W,
    registry: Arc<Registry<E>>,
    config: Arc<SessionConfig>,
) -> Result<(), SessionError>
where
    E: Environment,
    R: FrameSource,
    W: FrameSink,
{
    let mut outbound = {
        let config = Arc::clone(&config);
        tokio::spawn(async move { run_outbound(sink, mailbox, &config).await })
    };

    start(&session, &registry, &config);

    let (inbound_result, outbound_done) = tokio::select! {
        result = run_inbound(&session, &mut source, &registry, &config) => (result, None),
        joined = &mut outbound => (Ok(()), Some(joined)),
    };

    session.shutdown();

    let joined = match outbound_done {
        Some(joined) => joined,
        None => outbound.await,
    };
    let outbound_result =
        joined.unwrap_or_else(|e| Err(SessionError::Aborted(e.to_string())));

    let result = inbound_result.and(outbound_result);
    let lifetime = registry.env().now() - session.connected_at();
    match &result {
        Ok(()) => tracing::info!(session_id = session.id(), ?lifetime, "session closed"),
        Err(e) if e.is_timeout() => {
            tracing::info!(session_id = session.id(), ?lifetime, error = %e, "session timed out");
        },
        Err(e) => {
            tracing::debug!(session_id = session.id(), ?lifetime, error = %e, "session failed");
        },
    }
    result
}

/// Land a new session in the lobby and greet it.
fn start<E: Environment>(
    session: &Arc<Session<E>>,
    registry: &Arc<Registry<E>>,
    config: &SessionConfig,
) {
    if let Some(lobby) = &config.lobby {
        commands::join(session, registry, lobby);
    }
    if config.send_help_on_connect {
        session.notify(registry.env(), roomcast_proto::HELP_TEXT);
    }
}

/// Inbound pump: read and dispatch frames until the peer goes away, a read
/// fails, the read deadline passes, or the session quits.
pub async fn run_inbound<E, R>(
    session: &Arc<Session<E>>,
    source: &mut R,
    registry: &Arc<Registry<E>>,
    config: &SessionConfig,
) -> Result<(), SessionError>
where
    E: Environment,
    R: FrameSource + ?Sized,
{
    let mut deadline = Instant::now() + config.pong_wait;

    loop {
        let frame = match timeout_at(deadline, source.recv()).await {
            Ok(frame) => frame?,
            Err(_) => return Err(SessionError::ReadTimeout(config.pong_wait)),
        };

        match frame {
            None => {
                tracing::debug!(session_id = session.id(), "peer closed connection");
                return Ok(());
            },
            Some(Inbound::Pong) => deadline = Instant::now() + config.pong_wait,
            Some(Inbound::Ping) => {
                if let Err(e) = session.send(Outbound::Pong) {
                    tracing::debug!(session_id = session.id(), error = %e, "pong dropped");
                }
            },
            Some(Inbound::Text(text)) => {
                if on_frame(&text, session, registry, config).await == Flow::Quit {
                    return Ok(());
                }
            },
        }
    }
}

/// Dispatch one inbound text frame.
///
/// Newlines become spaces and the result is trimmed. Empty frames are
/// dropped. Command frames go to the interpreter; anything else is broadcast
/// to the session's room under its current name, or discarded if it has no
/// room.
pub async fn on_frame<E: Environment>(
    frame: &str,
    session: &Arc<Session<E>>,
    registry: &Arc<Registry<E>>,
    config: &SessionConfig,
) -> Flow {
    let cleaned = frame.replace(['\r', '\n'], " ");
    let text = cleaned.trim();

    if text.is_empty() {
        tracing::debug!(session_id = session.id(), "empty frame dropped");
        return Flow::Continue;
    }

    if Command::is_command(text) {
        return commands::handle(text, session, registry, config).await;
    }

    match session.room() {
        Some(room) => {
            let sender = session.name();
            let report = room.broadcast(&sender, text);
            tracing::trace!(
                session_id = session.id(),
                room = room.name(),
                delivered = report.delivered,
                evicted = report.evicted.len(),
                "broadcast"
            );
        },
        None => {
            tracing::debug!(session_id = session.id(), "message outside any room discarded");
        },
    }
    Flow::Continue
}

/// Outbound pump: write mailbox items in batches and probe the peer every
/// `ping_period`.
///
/// Ends cleanly once the mailbox is closed and drained, after writing the
/// close indicator. A failed or overdue write ends it with an error.
pub async fn run_outbound<W>(
    mut sink: W,
    mut mailbox: MailboxReceiver,
    config: &SessionConfig,
) -> Result<(), SessionError>
where
    W: FrameSink,
{
    let mut keepalive = interval_at(Instant::now() + config.ping_period, config.ping_period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            item = mailbox.recv() => {
                let Some(first) = item else {
                    if let Err(e) = write(config.write_wait, sink.close()).await {
                        tracing::debug!(error = %e, "close indicator not delivered");
                    }
                    return Ok(());
                };

                let mut batch = vec![first];
                batch.extend(mailbox.drain());
                write(config.write_wait, sink.send_batch(&batch)).await?;
            },
            _ = keepalive.tick() => {
                write(config.write_wait, sink.ping()).await?;
            },
        }
    }
}

async fn write<F>(wait: Duration, op: F) -> Result<(), SessionError>
where
    F: Future<Output = Result<(), TransportError>>,
{
    match timeout(wait, op).await {
        Ok(result) => result.map_err(SessionError::from),
        Err(_) => Err(SessionError::WriteTimeout(wait)),
    }
}
