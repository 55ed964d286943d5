//! Client configuration.
//!
//! Configuration is resolved from three sources, in priority order:
//! YAML file > environment variables > defaults. A `.env` file is honored
//! through `dotenvy` before environment variables are read.
//!
//! # Environment Variables
//!
//! - `VOCALINK_SERVER_URL` - WebSocket endpoint (`ws://` or `wss://`)
//! - `VOCALINK_MODE` - `realtime` or `legacy`
//! - `VOCALINK_CHATBOT_ID` - chatbot to bind the session to
//!
//! # Example
//! ```rust,no_run
//! use vocalink::ClientConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! println!("Connecting to {}", config.server_url);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::session::SessionMode;

/// Sample rate of the outbound stream and of realtime TTS payloads (Hz).
pub const SERVER_SAMPLE_RATE: u32 = 24_000;

/// Default chatbot to bind new sessions to.
const DEFAULT_CHATBOT_ID: u32 = 1;

/// Configuration for a streaming voice client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// WebSocket endpoint of the voice service.
    pub server_url: String,

    /// Operating mode for new sessions.
    #[serde(default)]
    pub mode: SessionMode,

    /// Chatbot identifier sent in the handshake.
    #[serde(default = "default_chatbot_id")]
    pub chatbot_id: u32,

    /// Sample rate the service expects on the wire (Hz).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Sample rate advertised for the client in the handshake (Hz).
    #[serde(default = "default_sample_rate")]
    pub client_sample_rate: u32,
}

fn default_chatbot_id() -> u32 {
    DEFAULT_CHATBOT_ID
}

fn default_sample_rate() -> u32 {
    SERVER_SAMPLE_RATE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8000/api/ws/".to_string(),
            mode: SessionMode::default(),
            chatbot_id: DEFAULT_CHATBOT_ID,
            sample_rate: SERVER_SAMPLE_RATE,
            client_sample_rate: SERVER_SAMPLE_RATE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables (and `.env`), falling
    /// back to defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse or validation fails.
    pub fn from_env() -> ClientResult<Self> {
        // Load .env if present; already-set process variables win
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(url) = std::env::var("VOCALINK_SERVER_URL") {
            config.server_url = url;
        }
        if let Ok(mode) = std::env::var("VOCALINK_MODE") {
            config.mode = mode.parse()?;
        }
        if let Ok(id) = std::env::var("VOCALINK_CHATBOT_ID") {
            config.chatbot_id = id.parse().map_err(|_| {
                ClientError::InvalidConfiguration(format!("VOCALINK_CHATBOT_ID: {id}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged configuration fails validation.
    pub fn from_file(path: &Path) -> ClientResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClientError::InvalidConfiguration(format!("{}: {e}", path.display()))
        })?;
        let mut config: Self = serde_yaml::from_str(&raw)
            .map_err(|e| ClientError::InvalidConfiguration(format!("{}: {e}", path.display())))?;

        dotenvy::dotenv().ok();
        if let Ok(mode) = std::env::var("VOCALINK_MODE") {
            config.mode = mode.parse()?;
        }
        if let Ok(id) = std::env::var("VOCALINK_CHATBOT_ID")
            && let Ok(id) = id.parse()
        {
            config.chatbot_id = id;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the endpoint is not a WebSocket
    /// URL or a sample rate is zero.
    pub fn validate(&self) -> ClientResult<()> {
        let url = url::Url::parse(&self.server_url).map_err(|e| {
            ClientError::InvalidConfiguration(format!("server_url {}: {e}", self.server_url))
        })?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ClientError::InvalidConfiguration(format!(
                "server_url must use ws:// or wss://, got {}",
                url.scheme()
            )));
        }
        if self.sample_rate == 0 || self.client_sample_rate == 0 {
            return Err(ClientError::InvalidConfiguration(
                "sample rates must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.mode, SessionMode::Realtime);
        assert_eq!(config.chatbot_id, 1);
        assert_eq!(config.sample_rate, 24_000);
        assert_eq!(config.client_sample_rate, 24_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let config = ClientConfig {
            server_url: "http://example.com/ws".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server_url: wss://voice.example.com/api/ws/\nmode: legacy\nchatbot_id: 7"
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server_url, "wss://voice.example.com/api/ws/");
        assert_eq!(config.mode, SessionMode::Legacy);
        assert_eq!(config.chatbot_id, 7);
        // Unspecified fields fall back to defaults
        assert_eq!(config.sample_rate, 24_000);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ClientConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ClientConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.server_url, config.server_url);
        assert_eq!(parsed.mode, config.mode);
    }
}
