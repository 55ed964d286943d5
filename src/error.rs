//! Error types for the voice client.
//!
//! All fallible operations in the crate return [`ClientResult`], so errors
//! propagate with `?` from the audio layer up through the session facade.

use thiserror::Error;

/// Errors that can occur during a streaming voice session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection to the voice service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Capture device error (missing device, unsupported format, busy)
    #[error("Capture device error: {0}")]
    CaptureDevice(String),

    /// Playback error (missing output device, decode failure)
    #[error("Playback error: {0}")]
    Playback(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::ConnectionFailed("refused".to_string());
        assert!(err.to_string().contains("Connection failed"));

        let err = ClientError::NotConnected;
        assert_eq!(err.to_string(), "Not connected");
    }
}
