//! Wire records: `sender|timestamp|content`.
//!
//! Every message a room delivers is one record with exactly three fields.
//! Content is passed through uninterpreted; there is no escaping of the
//! delimiter, so frame boundaries come from the transport, not from parsing.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::errors::{ProtocolError, Result};

/// Field separator.
pub const FIELD_DELIMITER: char = '|';

/// Sender name used for broker-generated notices.
pub const SERVER_SENDER: &str = "Server";

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    /// Display name of the sender at the time of the broadcast
    pub sender: String,
    /// Server-assigned timestamp (`HH:MM`)
    pub timestamp: String,
    /// Message text
    pub content: String,
}

impl WireRecord {
    /// Build a record from its three fields.
    pub fn new(
        sender: impl Into<String>,
        timestamp: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self { sender: sender.into(), timestamp: timestamp.into(), content: content.into() }
    }

    /// Parse an encoded record.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MalformedRecord` unless the text splits into exactly
    ///   three fields
    pub fn parse(encoded: &str) -> Result<Self> {
        let fields: Vec<&str> = encoded.split(FIELD_DELIMITER).collect();
        match fields.as_slice() {
            [sender, timestamp, content] => Ok(Self::new(*sender, *timestamp, *content)),
            _ => Err(ProtocolError::MalformedRecord { fields: fields.len() }),
        }
    }

    /// Encode as `sender|timestamp|content`.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WireRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.sender, self.timestamp, self.content
        )
    }
}

impl FromStr for WireRecord {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Format seconds since the Unix epoch as a 24-hour `HH:MM` (UTC) timestamp.
///
/// Instants chrono cannot represent render as `00:00`.
#[must_use]
pub fn format_timestamp(unix_secs: u64) -> String {
    i64::try_from(unix_secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map_or_else(|| "00:00".to_string(), |time| time.format("%H:%M").to_string())
}
