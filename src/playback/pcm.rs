//! Low-latency raw-PCM playback for realtime sessions.
//!
//! Decodes PCM16-LE units into floats and appends them to a shared sample
//! queue. A dedicated output thread is created lazily on the first unit
//! and reused for the rest of the session; its cpal callback drains the
//! queue and plays silence when the queue is empty, so consecutive units
//! play back-to-back without re-opening the device.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::PlaybackSink;
use crate::audio::OUTPUT_SAMPLE_RATE;
use crate::error::{ClientError, ClientResult};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Realtime playback sink: a session-lifetime 24 kHz output stream fed
/// from a sample queue.
pub struct PcmStreamPlayer {
    queue: Arc<Mutex<VecDeque<f32>>>,
    worker: tokio::sync::Mutex<Option<OutputWorker>>,
}

struct OutputWorker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl OutputWorker {
    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Default for PcmStreamPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PcmStreamPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    /// Start the output thread if it is not running yet.
    async fn ensure_worker(&self) -> ClientResult<()> {
        let mut guard = self.worker.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let queue = Arc::clone(&self.queue);
        let (ready_tx, ready_rx) = oneshot::channel::<ClientResult<()>>();

        let thread = std::thread::Builder::new()
            .name("vocalink-playback".to_string())
            .spawn(move || output_thread(queue, thread_stop, ready_tx))
            .map_err(|e| ClientError::Playback(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                *guard = Some(OutputWorker {
                    stop,
                    thread: Some(thread),
                });
                tracing::debug!("realtime playback stream started");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(ClientError::Playback(
                    "playback thread exited before the stream started".to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl PlaybackSink for PcmStreamPlayer {
    async fn play(&self, audio: Bytes) -> ClientResult<()> {
        self.ensure_worker().await?;

        let samples = decode_pcm16(&audio);
        if samples.is_empty() {
            tracing::warn!("empty PCM unit ({} bytes)", audio.len());
            return Ok(());
        }

        self.queue.lock().extend(samples);
        Ok(())
    }

    async fn stop(&self) {
        self.queue.lock().clear();
        if let Some(mut worker) = self.worker.lock().await.take() {
            worker.shutdown();
            tracing::debug!("realtime playback stream released");
        }
    }
}

/// Decode PCM16-LE bytes into clipped float samples. A trailing odd byte
/// is ignored.
fn decode_pcm16(audio: &[u8]) -> Vec<f32> {
    audio
        .chunks_exact(2)
        .map(|pair| {
            let v = f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0;
            v.clamp(-1.0, 1.0)
        })
        .collect()
}

/// Body of the dedicated output thread: open the device at 24 kHz, drain
/// the queue until stopped.
fn output_thread(
    queue: Arc<Mutex<VecDeque<f32>>>,
    stop: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<ClientResult<()>>,
) {
    let built = open_output_stream(queue);
    match built {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            while !stop.load(Ordering::SeqCst) {
                std::thread::sleep(STOP_POLL_INTERVAL);
            }
            drop(stream);
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

fn open_output_stream(queue: Arc<Mutex<VecDeque<f32>>>) -> ClientResult<Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| ClientError::Playback("no output device available".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| ClientError::Playback(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(OUTPUT_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(OUTPUT_SAMPLE_RATE)
        })
        .or_else(|| {
            // Fallback: stereo, duplicating the mono signal
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(OUTPUT_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(OUTPUT_SAMPLE_RATE)
            })
        })
        .ok_or_else(|| ClientError::Playback("no suitable output config found".to_string()))?;

    let config = supported
        .with_sample_rate(SampleRate(OUTPUT_SAMPLE_RATE))
        .config();
    let channels = config.channels as usize;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut queue = queue.lock();
                for frame in data.chunks_mut(channels) {
                    let sample = queue.pop_front().unwrap_or(0.0);
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| tracing::error!("playback stream error: {}", err),
            None,
        )
        .map_err(|e| ClientError::Playback(e.to_string()))?;

    stream
        .play()
        .map_err(|e| ClientError::Playback(e.to_string()))?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pcm16_full_scale() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&i16::MAX.to_le_bytes());
        bytes.extend_from_slice(&i16::MIN.to_le_bytes());
        bytes.extend_from_slice(&0i16.to_le_bytes());

        let samples = decode_pcm16(&bytes);
        assert_eq!(samples.len(), 3);
        assert!((samples[0] - 32767.0 / 32768.0).abs() < 1e-6);
        assert!((samples[1] + 1.0).abs() < 1e-6);
        assert_eq!(samples[2], 0.0);
    }

    #[test]
    fn test_decode_pcm16_ignores_trailing_byte() {
        let samples = decode_pcm16(&[0x00, 0x40, 0x7F]);
        assert_eq!(samples.len(), 1);
    }
}
