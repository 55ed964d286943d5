//! Wire message types for the voice service protocol.
//!
//! All control traffic is JSON over WebSocket text messages, tagged by a
//! `type` field; audio travels as raw binary messages and never appears
//! here.
//!
//! # Protocol Overview
//!
//! Client messages (sent to service):
//! - `config` - handshake, first message after the channel opens
//! - `chat` - typed user message
//! - `send` - commit signal ending a legacy capture segment
//! - `disconnect` - clean session teardown
//!
//! Server messages (received from service):
//! - `stt_text` - transcription of the user's speech (partial or final)
//! - `gpt_text` - assistant response text (partial or final)
//!
//! Unrecognized inbound tags deserialize to [`ServerMessage::Unknown`] so
//! the dispatch layer can log and ignore them instead of dropping the
//! channel.

use serde::{Deserialize, Serialize};

use super::SessionMode;

/// Messages sent from the client to the voice service.
///
/// Immutable once constructed; every variant carries the session id the
/// service uses to correlate the message with its connection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Handshake: announces the session, stream format, and mode.
    Config {
        session_id: String,
        /// Sample rate of the frames on the wire
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
        /// Sample rate the client captures at, pre-resampling
        #[serde(rename = "clientSampleRate")]
        client_sample_rate: u32,
        mode: SessionMode,
        chatbot_id: u32,
    },

    /// Typed chat message.
    Chat {
        session_id: String,
        text: String,
        mode: SessionMode,
    },

    /// Legacy commit: the recorded segment is complete, respond now.
    Send { session_id: String },

    /// Clean teardown notice, sent best-effort before closing.
    Disconnect { session_id: String },
}

/// Messages received from the voice service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Speech-to-text result for the user's audio.
    SttText {
        #[serde(default)]
        text: String,
        /// True for incremental results that later results extend
        #[serde(default)]
        partial: bool,
    },

    /// Assistant response text.
    GptText {
        #[serde(default)]
        text: String,
        #[serde(default)]
        partial: bool,
    },

    /// Any tag this client does not understand.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_wire_format() {
        let msg = ClientMessage::Config {
            session_id: "abc".to_string(),
            sample_rate: 24_000,
            client_sample_rate: 24_000,
            mode: SessionMode::Realtime,
            chatbot_id: 1,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "config");
        assert_eq!(json["session_id"], "abc");
        assert_eq!(json["sampleRate"], 24_000);
        assert_eq!(json["clientSampleRate"], 24_000);
        assert_eq!(json["mode"], "realtime");
        assert_eq!(json["chatbot_id"], 1);
    }

    #[test]
    fn test_commit_and_disconnect_tags() {
        let json = serde_json::to_value(ClientMessage::Send {
            session_id: "s".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "send");

        let json = serde_json::to_value(ClientMessage::Disconnect {
            session_id: "s".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "disconnect");
    }

    #[test]
    fn test_chat_carries_mode() {
        let json = serde_json::to_value(ClientMessage::Chat {
            session_id: "s".to_string(),
            text: "hello".to_string(),
            mode: SessionMode::Legacy,
        })
        .unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["mode"], "legacy");
    }

    #[test]
    fn test_stt_text_partial_defaults_to_final() {
        // Legacy sessions omit the partial flag entirely
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"stt_text","text":"hi"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::SttText {
                text: "hi".to_string(),
                partial: false,
            }
        );
    }

    #[test]
    fn test_stt_text_missing_text_defaults_empty() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"stt_text","partial":true}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::SttText {
                text: String::new(),
                partial: true,
            }
        );
    }

    #[test]
    fn test_unknown_tag_is_tolerated() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"usage_report","tokens":42}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn test_gpt_text_partial_flag() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"gpt_text","text":"Hel","partial":true}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::GptText {
                text: "Hel".to_string(),
                partial: true,
            }
        );
    }
}
