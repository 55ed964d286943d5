//! Inbound audio playback.
//!
//! One binary WebSocket message is one complete TTS unit. How it is
//! decoded and scheduled depends on the session mode, so the two
//! strategies live behind [`PlaybackSink`] and the session picks one when
//! it opens:
//!
//! - [`PcmStreamPlayer`] - raw PCM16-LE at 24 kHz, appended to a
//!   continuously running output stream (low latency).
//! - [`ClipPlayer`] - complete MP3 clips played one at a time with
//!   exclusive ownership of the output device.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ClientResult;

pub mod clip;
pub mod pcm;

pub use clip::ClipPlayer;
pub use pcm::PcmStreamPlayer;

/// Destination for inbound TTS audio units.
///
/// `play` resolves when the unit has been handed to the audio layer
/// (realtime) or has finished, failed, or been preempted (legacy), so the
/// caller can emit its end notification exactly once per unit on every
/// path.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Play one complete binary audio unit.
    async fn play(&self, audio: Bytes) -> ClientResult<()>;

    /// Stop whatever is playing and release the output resources.
    async fn stop(&self);
}
