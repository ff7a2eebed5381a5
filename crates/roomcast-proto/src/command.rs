//! In-band command protocol.
//!
//! A text frame whose first character is [`COMMAND_MARKER`] is a command:
//! the marker, a verb, then whitespace-separated arguments. Parsing validates
//! arity up front so the interpreter never applies half a command.
//!
//! The broker also writes two marker-prefixed control frames back to clients:
//! [`ROOM_CHANGE_MARKER`] followed by the new room name, and the bare
//! [`TERMINATION_MARKER`] once a `quit` has been honoured.

use crate::{FIELD_DELIMITER, errors::CommandError};

/// First character of every command frame.
pub const COMMAND_MARKER: char = '/';

/// Control frame announcing the session's new room: `/userRoom <room>`.
pub const ROOM_CHANGE_MARKER: &str = "/userRoom";

/// Control frame telling the client the session is over.
pub const TERMINATION_MARKER: &str = "/quit";

/// Usage text returned by `help` and sent on connect.
pub const HELP_TEXT: &str = "Welcome to roomcast! Send /help at any time to see this message again. \
Commands: /join <room> - join a room, creating it if it does not exist; \
/name <newName> - change your display name; \
/rooms - list the open rooms; \
/users - list the users in your current room; \
/quit - leave the chat";

/// A parsed, arity-checked command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move to another room, creating it on demand
    Join {
        /// Target room name
        room: String,
    },
    /// Change display name
    Name {
        /// New display name
        name: String,
    },
    /// List registered rooms
    Rooms,
    /// List members of the current room
    Users,
    /// Usage text
    Help,
    /// End the session
    Quit,
}

impl Command {
    /// Whether a (trimmed) frame is a command frame.
    #[must_use]
    pub fn is_command(frame: &str) -> bool {
        frame.starts_with(COMMAND_MARKER)
    }

    /// Parse a command frame.
    ///
    /// `join` and `name` take exactly one argument. The remaining verbs take
    /// none and ignore anything after the verb.
    ///
    /// # Errors
    ///
    /// - `CommandError::NotACommand` if the marker is missing
    /// - `CommandError::Empty` if nothing follows the marker
    /// - `CommandError::UnknownVerb` for unrecognized verbs
    /// - `CommandError::ArgumentCount` for wrong arity
    /// - `CommandError::InvalidName` if a new name contains the record
    ///   delimiter
    /// - `CommandError::InvalidRoom` if a room name contains the record
    ///   delimiter
    pub fn parse(frame: &str) -> Result<Self, CommandError> {
        let body = frame.strip_prefix(COMMAND_MARKER).ok_or(CommandError::NotACommand)?;
        let mut tokens = body.split_whitespace();
        let verb = tokens.next().ok_or(CommandError::Empty)?;
        let args: Vec<&str> = tokens.collect();

        match verb {
            "join" => {
                let room = single_arg("join", &args)?;
                if room.contains(FIELD_DELIMITER) {
                    return Err(CommandError::InvalidRoom(room));
                }
                Ok(Self::Join { room })
            },
            "name" => {
                let name = single_arg("name", &args)?;
                if name.contains(FIELD_DELIMITER) {
                    return Err(CommandError::InvalidName(name));
                }
                Ok(Self::Name { name })
            },
            "rooms" => Ok(Self::Rooms),
            "users" => Ok(Self::Users),
            "help" => Ok(Self::Help),
            "quit" => Ok(Self::Quit),
            other => Err(CommandError::UnknownVerb(other.to_string())),
        }
    }

    /// Verb as written on the wire.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Name { .. } => "name",
            Self::Rooms => "rooms",
            Self::Users => "users",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

fn single_arg(verb: &'static str, args: &[&str]) -> Result<String, CommandError> {
    match args {
        [arg] => Ok((*arg).to_string()),
        _ => Err(CommandError::ArgumentCount { verb, expected: 1, actual: args.len() }),
    }
}

/// Room-change control frame for `room`.
#[must_use]
pub fn room_change_frame(room: &str) -> String {
    format!("{ROOM_CHANGE_MARKER} {room}")
}
