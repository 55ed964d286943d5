//! Exclusive compressed-clip playback for legacy sessions.
//!
//! Each binary unit is a complete MP3 clip. The output device is owned by
//! at most one clip at a time: starting a new clip first stops and
//! releases the previous one. A clip releases its stream and its handle on
//! natural completion, on error, and on forced stop alike, and its `play`
//! future resolves on every one of those paths.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::PlaybackSink;
use crate::error::{ClientError, ClientResult};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Legacy playback sink: one MP3 clip at a time, exclusive device access.
pub struct ClipPlayer {
    current: Arc<Mutex<Option<ClipHandle>>>,
    next_generation: AtomicU64,
}

/// Handle to the clip currently holding the output device.
///
/// The generation tag lets a finished clip clear only its own handle; a
/// clip that was already replaced leaves the newer handle untouched.
struct ClipHandle {
    generation: u64,
    stop: Arc<AtomicBool>,
}

impl Default for ClipPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            next_generation: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl PlaybackSink for ClipPlayer {
    async fn play(&self, audio: Bytes) -> ClientResult<()> {
        // Release whatever is still playing before taking the device
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let stop = Arc::new(AtomicBool::new(false));
        {
            let mut current = self.current.lock();
            if let Some(prev) = current.take() {
                prev.stop.store(true, Ordering::SeqCst);
                tracing::debug!("stopping previous clip before starting a new one");
            }
            *current = Some(ClipHandle {
                generation,
                stop: Arc::clone(&stop),
            });
        }

        let (samples, sample_rate) = decode_mp3(&audio)?;
        if samples.is_empty() {
            release_if_current(&self.current, generation);
            return Err(ClientError::Playback("empty audio clip".to_string()));
        }

        let (done_tx, done_rx) = oneshot::channel::<ClientResult<()>>();
        let current = Arc::clone(&self.current);
        let thread = std::thread::Builder::new()
            .name("vocalink-clip".to_string())
            .spawn(move || {
                let result = play_clip(&samples, sample_rate, &stop);
                release_if_current(&current, generation);
                let _ = done_tx.send(result);
            })
            .map_err(|e| ClientError::Playback(e.to_string()));

        if let Err(e) = thread {
            release_if_current(&self.current, generation);
            return Err(e);
        }

        match done_rx.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Playback("clip thread vanished".to_string())),
        }
    }

    async fn stop(&self) {
        if let Some(handle) = self.current.lock().take() {
            handle.stop.store(true, Ordering::SeqCst);
            tracing::debug!("clip playback stopped");
        }
    }
}

/// Clear the current handle if it still belongs to `generation`.
fn release_if_current(current: &Mutex<Option<ClipHandle>>, generation: u64) {
    let mut guard = current.lock();
    if guard.as_ref().is_some_and(|h| h.generation == generation) {
        *guard = None;
    }
}

/// Decode a complete MP3 unit to mono float samples.
///
/// Stereo frames are averaged down to mono; the sample rate of the first
/// frame wins.
fn decode_mp3(data: &[u8]) -> ClientResult<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                }
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|pair| {
                        let left = f32::from(pair[0]) / 32768.0;
                        let right = f32::from(pair.get(1).copied().unwrap_or(pair[0])) / 32768.0;
                        (left + right) / 2.0
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(ClientError::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}

/// Play decoded samples on a fresh output stream, returning when the clip
/// completes, errors, or is stopped. The stream is dropped before return.
fn play_clip(samples: &[f32], sample_rate: u32, stop: &AtomicBool) -> ClientResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| ClientError::Playback("no output device available".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| ClientError::Playback(e.to_string()))?
        .find(|c| {
            c.channels() <= 2
                && c.min_sample_rate() <= cpal::SampleRate(sample_rate)
                && c.max_sample_rate() >= cpal::SampleRate(sample_rate)
        })
        .ok_or_else(|| ClientError::Playback("no suitable output config found".to_string()))?;

    let config = supported
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .config();
    let channels = config.channels as usize;

    let shared = Arc::new(samples.to_vec());
    let position = Arc::new(AtomicUsize::new(0));
    let cb_samples = Arc::clone(&shared);
    let cb_position = Arc::clone(&position);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let pos = cb_position.fetch_add(1, Ordering::Relaxed);
                    let sample = cb_samples.get(pos).copied().unwrap_or(0.0);
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| tracing::error!("clip stream error: {}", err),
            None,
        )
        .map_err(|e| ClientError::Playback(e.to_string()))?;

    stream
        .play()
        .map_err(|e| ClientError::Playback(e.to_string()))?;

    // Drain until the clip ends, a stop is requested, or the expected
    // duration (plus slack) elapses
    let duration_ms = (shared.len() as u64 * 1000) / u64::from(sample_rate.max(1));
    let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);

    while position.load(Ordering::Relaxed) < shared.len()
        && !stop.load(Ordering::SeqCst)
        && Instant::now() < deadline
    {
        std::thread::sleep(STOP_POLL_INTERVAL);
    }

    drop(stream);
    tracing::debug!("clip finished ({} samples)", shared.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        // Arbitrary non-MP3 bytes decode to no frames
        let result = decode_mp3(&[0u8, 1, 2, 3, 4, 5, 6, 7]);
        match result {
            Ok((samples, _)) => assert!(samples.is_empty()),
            Err(ClientError::Playback(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_new_clip_takes_over_handle() {
        let player = ClipPlayer::new();

        // Simulate a clip in flight
        let old_stop = Arc::new(AtomicBool::new(false));
        *player.current.lock() = Some(ClipHandle {
            generation: 0,
            stop: Arc::clone(&old_stop),
        });
        player.next_generation.store(1, Ordering::SeqCst);

        // Playing an undecodable unit still stops the previous clip first
        let _ = player.play(Bytes::from_static(&[0u8; 16])).await;

        assert!(old_stop.load(Ordering::SeqCst), "previous clip stopped");
        assert!(player.current.lock().is_none(), "failed clip released its handle");
    }

    #[tokio::test]
    async fn test_stop_with_nothing_playing_is_a_no_op() {
        let player = ClipPlayer::new();
        player.stop().await;
        assert!(player.current.lock().is_none());
    }
}
