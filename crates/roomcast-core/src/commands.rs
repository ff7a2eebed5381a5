//! Command interpreter.
//!
//! Stateless dispatch from a parsed [`Command`] to session, room and registry
//! operations. Parsing (and therefore arity checking) happens before any
//! state is touched, so a malformed command has no effect beyond a log line.

use std::sync::Arc;

use roomcast_proto::{
    Command, HELP_TEXT, SERVER_SENDER, TERMINATION_MARKER, room_change_frame,
};

use crate::{Environment, config::SessionConfig, registry::Registry, session::Session};

/// What the inbound pump should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading
    Continue,
    /// The session asked to leave; stop reading and tear down
    Quit,
}

/// Parse and execute one command frame.
///
/// Unknown verbs are inert. Malformed commands are logged and ignored.
/// Neither is ever reported to the peer.
pub async fn handle<E: Environment>(
    frame: &str,
    session: &Arc<Session<E>>,
    registry: &Arc<Registry<E>>,
    config: &SessionConfig,
) -> Flow {
    match Command::parse(frame) {
        Ok(command) => execute(command, session, registry, config).await,
        Err(e) if e.is_unknown_verb() => {
            tracing::info!(session_id = session.id(), error = %e, "unknown command");
            Flow::Continue
        },
        Err(e) => {
            tracing::warn!(session_id = session.id(), error = %e, "malformed command rejected");
            Flow::Continue
        },
    }
}

/// Execute an already-parsed command.
pub async fn execute<E: Environment>(
    command: Command,
    session: &Arc<Session<E>>,
    registry: &Arc<Registry<E>>,
    config: &SessionConfig,
) -> Flow {
    let env = registry.env();
    tracing::debug!(session_id = session.id(), verb = command.verb(), "command");

    match command {
        Command::Join { room } => {
            join(session, registry, &room);
        },
        Command::Name { name } => {
            let old = session.rename(name.as_str());
            if let Some(room) = session.room() {
                room.broadcast(SERVER_SENDER, &format!("{old} set their name to {name}"));
            }
        },
        Command::Rooms => {
            session.notify(env, &format!("Room List: {}", registry.room_names().join(", ")));
        },
        Command::Users => {
            let names = session.room().map(|room| room.member_names()).unwrap_or_default();
            session.notify(env, &format!("Client List: {}", names.join(", ")));
        },
        Command::Help => session.notify(env, HELP_TEXT),
        Command::Quit => {
            session.notify(env, "Exiting program...");
            env.sleep(config.quit_grace).await;
            if let Err(e) = session.send_text(TERMINATION_MARKER) {
                tracing::debug!(session_id = session.id(), error = %e, "termination marker dropped");
            }
            session.detach();
            return Flow::Quit;
        },
    }

    Flow::Continue
}

/// Move `session` into `room`, leaving its current room first.
///
/// The room-change control frame goes out before the join so the peer knows
/// which room the replayed history and arrival notice belong to.
pub fn join<E: Environment>(session: &Arc<Session<E>>, registry: &Arc<Registry<E>>, room: &str) {
    session.detach();
    if let Err(e) = session.send_text(room_change_frame(room)) {
        tracing::debug!(session_id = session.id(), error = %e, "room change notice dropped");
    }
    registry.join(room, session);
    tracing::info!(session_id = session.id(), room, "session joined room");
}
