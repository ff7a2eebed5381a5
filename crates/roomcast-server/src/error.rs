//! Server error types.

use thiserror::Error;

/// Errors that can occur in the server.
///
/// Per-session failures never show up here; they end that session and are
/// logged by the session pumps.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, unreadable TLS files, etc.).
    ///
    /// Fatal at startup. Fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error (endpoint failure, handshake failure, etc.).
    ///
    /// Fatal for one connection during accept, fatal for the server at bind.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_transport_errors() {
        let err = ServerError::from(std::io::Error::other("signal handler unavailable"));
        assert!(matches!(err, ServerError::Transport(msg) if msg == "signal handler unavailable"));
    }
}
