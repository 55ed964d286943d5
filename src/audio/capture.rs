//! Microphone capture.
//!
//! The cpal input stream is `!Send`, so it lives on a dedicated thread for
//! the whole recording segment. The real-time callback owns the
//! [`CapturePipeline`] exclusively and only ever touches it plus an
//! unbounded frame channel, so it never blocks and never contends with the
//! session's shared state. Device setup errors are reported back to the
//! caller synchronously through a one-shot channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use tokio::sync::{mpsc, oneshot};

use super::pipeline::CapturePipeline;
use crate::error::{ClientError, ClientResult};

/// Poll interval for the capture thread's stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handle to an active microphone capture stream.
///
/// Dropping the handle without calling [`stop`](Self::stop) also tears the
/// stream down, but `stop` should be preferred so the thread is joined.
pub struct MicCapture {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    sample_rate: u32,
}

impl MicCapture {
    /// Open the default input device and start capturing.
    ///
    /// Completed 480-byte frames are pushed into `frame_tx` from the
    /// capture callback. Resolves once the device stream is running.
    ///
    /// # Errors
    ///
    /// Returns `CaptureDevice` if no input device exists, its configuration
    /// is unsupported, or the stream fails to start.
    pub async fn start(frame_tx: mpsc::UnboundedSender<Bytes>) -> ClientResult<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let (ready_tx, ready_rx) = oneshot::channel::<ClientResult<u32>>();

        let thread = std::thread::Builder::new()
            .name("vocalink-capture".to_string())
            .spawn(move || capture_thread(frame_tx, thread_stop, ready_tx))
            .map_err(|e| ClientError::CaptureDevice(e.to_string()))?;

        let sample_rate = match ready_rx.await {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(ClientError::CaptureDevice(
                    "capture thread exited before the stream started".to_string(),
                ));
            }
        };

        tracing::debug!("microphone capture started at {} Hz", sample_rate);
        Ok(Self {
            stop,
            thread: Some(thread),
            sample_rate,
        })
    }

    /// Native sample rate of the capture device.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stop capturing and release the device.
    ///
    /// Blocks briefly while the capture thread drops the stream; call from
    /// a blocking-friendly context.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            tracing::debug!("microphone capture stopped");
        }
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the dedicated capture thread: open the device, run the stream,
/// park until stopped, release.
fn capture_thread(
    frame_tx: mpsc::UnboundedSender<Bytes>,
    stop: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<ClientResult<u32>>,
) {
    let built = open_stream(frame_tx);
    match built {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
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

/// Open the default input device with its default configuration and wire
/// the callback through the capture pipeline.
fn open_stream(frame_tx: mpsc::UnboundedSender<Bytes>) -> ClientResult<(Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| ClientError::CaptureDevice("no input device available".to_string()))?;

    let supported = device
        .default_input_config()
        .map_err(|e| ClientError::CaptureDevice(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config = supported.config();
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;

    tracing::debug!(
        "input device {} ({} Hz, {} ch, {:?})",
        device.name().unwrap_or_default(),
        sample_rate,
        channels,
        sample_format
    );

    let mut pipeline = CapturePipeline::new(sample_rate, frame_tx);
    let err_fn = |err| tracing::error!("capture stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    push_mono(&mut pipeline, data, channels);
                },
                err_fn,
                None,
            )
            .map_err(|e| ClientError::CaptureDevice(e.to_string()))?,
        SampleFormat::I16 => {
            let mut scratch = Vec::new();
            device
                .build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| f32::from(s) / 32768.0));
                        push_mono(&mut pipeline, &scratch, channels);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| ClientError::CaptureDevice(e.to_string()))?
        }
        other => {
            return Err(ClientError::CaptureDevice(format!(
                "unsupported input sample format {other:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| ClientError::CaptureDevice(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Mix an interleaved block down to mono and feed it to the pipeline.
fn push_mono(pipeline: &mut CapturePipeline, data: &[f32], channels: usize) {
    if channels <= 1 {
        pipeline.push_block(data);
        return;
    }
    let mono: Vec<f32> = data
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    pipeline.push_block(&mono);
}
