//! Session and room tuning.

use std::time::Duration;

/// Outbound mailbox depth per session.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Time allowed for a single outbound write.
pub const DEFAULT_WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed between keepalive acknowledgments.
pub const DEFAULT_PONG_WAIT: Duration = Duration::from_secs(60);

/// Keepalive probe interval. Must be shorter than the pong wait.
pub const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(54);

/// Pause between the farewell and the termination marker on `quit`.
pub const DEFAULT_QUIT_GRACE: Duration = Duration::from_secs(2);

/// Room every new session lands in.
pub const DEFAULT_LOBBY: &str = "waitingRoom";

/// Display name until the peer picks one.
pub const DEFAULT_DISPLAY_NAME: &str = "New User";

/// Records retained per room for replay to late joiners.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Per-session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Outbound mailbox capacity (minimum 1)
    pub mailbox_capacity: usize,
    /// Write deadline for every outbound write
    pub write_wait: Duration,
    /// Read deadline, refreshed on every keepalive acknowledgment
    pub pong_wait: Duration,
    /// Keepalive probe interval
    pub ping_period: Duration,
    /// Flush interval between farewell and termination marker
    pub quit_grace: Duration,
    /// Room joined on connect, if any
    pub lobby: Option<String>,
    /// Initial display name
    pub default_name: String,
    /// Send the usage text when a session connects
    pub send_help_on_connect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            write_wait: DEFAULT_WRITE_WAIT,
            pong_wait: DEFAULT_PONG_WAIT,
            ping_period: DEFAULT_PING_PERIOD,
            quit_grace: DEFAULT_QUIT_GRACE,
            lobby: Some(DEFAULT_LOBBY.to_string()),
            default_name: DEFAULT_DISPLAY_NAME.to_string(),
            send_help_on_connect: true,
        }
    }
}

/// Per-room configuration, shared by every room the registry creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Keep delivered records and replay them to joiners
    pub history: bool,
    /// Maximum retained records; oldest are dropped first
    pub history_limit: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self { history: true, history_limit: DEFAULT_HISTORY_LIMIT }
    }
}

impl RoomConfig {
    /// Configuration with history replay turned off.
    pub fn without_history() -> Self {
        Self { history: false, history_limit: 0 }
    }
}
