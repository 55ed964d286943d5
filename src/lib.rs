//! Vocalink - real-time voice chat streaming client.
//!
//! Streams live microphone audio to a conversational voice service over a
//! duplex WebSocket and plays back synthesized speech and text events in
//! near-real time. Two operating modes are supported: `realtime`
//! (continuous low-latency streaming) and `legacy` (segment-based capture
//! finalized by an explicit commit).
//!
//! The outbound signal path is capture -> resample (device rate -> 24 kHz)
//! -> 240-sample PCM16-LE frames -> binary WebSocket messages; inbound
//! binary messages are complete TTS units handed to a mode-specific
//! playback sink, coordinated with tagged JSON control events.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use vocalink::{ClientConfig, SessionController};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = SessionController::new(ClientConfig::from_env()?);
//!
//! controller.on_stt_text(Arc::new(|text, partial| Box::pin(async move {
//!     println!("[stt{}] {}", if partial { "*" } else { "" }, text);
//! })));
//!
//! controller.connect().await?;
//! controller.start_recording().await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod session;

// Re-export commonly used items for convenience
pub use audio::{FRAME_BYTES, FRAME_SAMPLES, OUTPUT_SAMPLE_RATE};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use session::{
    ConnectionState, SessionController, SessionEvents, SessionMode, TranscriptKind, TranscriptLog,
    TransportSession,
};
