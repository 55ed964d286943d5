//! Streaming session: wire protocol, duplex transport, command surface.
//!
//! A session is one logical connection to the voice service, identified by
//! a unique id and bound to exactly one [`SessionMode`] for its lifetime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub mod controller;
pub mod events;
pub mod messages;
pub mod transcript;
pub mod transport;

pub use controller::SessionController;
pub use events::{NotifyCallback, SessionEvents, SessionIdCallback, TextEventCallback};
pub use messages::{ClientMessage, ServerMessage};
pub use transcript::{TranscriptEntry, TranscriptKind, TranscriptLog};
pub use transport::TransportSession;

/// Operating mode of a session.
///
/// `Realtime` streams continuously with no explicit turn boundary; the
/// service consumes frames as they arrive and replies opportunistically.
/// `Legacy` records a segment and requires an explicit commit (`send`)
/// when recording stops before the service responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Continuous low-latency streaming, no commit message
    #[default]
    Realtime,
    /// Segment-based capture finalized by a commit message
    Legacy,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Realtime => write!(f, "realtime"),
            SessionMode::Legacy => write!(f, "legacy"),
        }
    }
}

impl std::str::FromStr for SessionMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realtime" => Ok(SessionMode::Realtime),
            "legacy" => Ok(SessionMode::Legacy),
            other => Err(ClientError::InvalidConfiguration(format!(
                "unknown mode: {other}"
            ))),
        }
    }
}

/// Connection state of the underlying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No channel open
    #[default]
    Disconnected,
    /// Channel being established
    Connecting,
    /// Channel open, handshake queued
    Connected,
    /// Teardown in progress
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Closing => write!(f, "Closing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display_round_trip() {
        for mode in [SessionMode::Realtime, SessionMode::Legacy] {
            let parsed: SessionMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
    }

    #[test]
    fn test_mode_parse_rejects_unknown() {
        assert!("duplex".parse::<SessionMode>().is_err());
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
    }
}
