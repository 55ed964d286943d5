//! Session command surface.
//!
//! [`SessionController`] is what the UI collaborator holds: five commands
//! (connect, disconnect, start/stop recording, send chat) and six event
//! callbacks. It owns the capture stream and wires completed frames from
//! the capture pipeline into the transport's send path; everything else
//! delegates to [`TransportSession`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use super::events::{NotifyCallback, SessionEvents, SessionIdCallback, TextEventCallback};
use super::transport::TransportSession;
use super::SessionMode;
use crate::audio::MicCapture;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Orchestrates capture, transport, and playback for one session at a
/// time.
pub struct SessionController {
    transport: Arc<TransportSession>,
    capture: Arc<Mutex<Option<MicCapture>>>,
    forward_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    recording: Arc<AtomicBool>,
    mode: SessionMode,
}

impl SessionController {
    /// Create a controller for the given configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let mode = config.mode;
        let controller = Self {
            transport: Arc::new(TransportSession::new(config)),
            capture: Arc::new(Mutex::new(None)),
            forward_handle: Arc::new(Mutex::new(None)),
            recording: Arc::new(AtomicBool::new(false)),
            mode,
        };

        // When the channel dies on its own (server close, transport
        // error), the capture device must be released as part of the same
        // cleanup, before the disconnect callback reaches the UI
        let capture = Arc::clone(&controller.capture);
        let forward_handle = Arc::clone(&controller.forward_handle);
        let recording = Arc::clone(&controller.recording);
        controller.transport.events().set_teardown(Arc::new(move || {
            let capture = Arc::clone(&capture);
            let forward_handle = Arc::clone(&forward_handle);
            let recording = Arc::clone(&recording);
            Box::pin(async move {
                release_capture(&capture, &forward_handle, &recording).await;
            })
        }));

        controller
    }

    /// Session id of the open connection, if any.
    pub async fn session_id(&self) -> Option<String> {
        self.transport.session_id().await
    }

    /// Whether the transport channel is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Whether a capture stream is active.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Open the connection and perform the handshake; no-op when already
    /// connected.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the channel cannot be established.
    pub async fn connect(&self) -> ClientResult<()> {
        self.transport.connect().await
    }

    /// Start microphone capture, streaming frames to the service.
    ///
    /// Idempotent while capture is active. On failure the recording flag
    /// reverts, so the caller can retry.
    ///
    /// # Errors
    ///
    /// Returns `CaptureDevice` if the microphone cannot be opened.
    pub async fn start_recording(&self) -> ClientResult<()> {
        if self.recording.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Bytes>();

        let capture = match MicCapture::start(frame_tx).await {
            Ok(capture) => capture,
            Err(e) => {
                self.recording.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        // Forward completed frames out of the capture thread's channel
        // into the transport in production order
        let transport = Arc::clone(&self.transport);
        let handle = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                transport.send_audio(frame).await;
            }
        });

        *self.capture.lock().await = Some(capture);
        *self.forward_handle.lock().await = Some(handle);
        tracing::info!("recording started");
        Ok(())
    }

    /// Stop capture, release the device, and in legacy mode commit the
    /// recorded segment.
    ///
    /// # Errors
    ///
    /// Returns `WebSocket` if the commit message cannot be queued.
    pub async fn stop_recording(&self) -> ClientResult<()> {
        release_capture(&self.capture, &self.forward_handle, &self.recording).await;

        if self.mode == SessionMode::Legacy {
            self.transport.commit().await?;
        }
        Ok(())
    }

    /// Send a chat message; trims the text and silently drops it when
    /// empty or the session is not open.
    ///
    /// # Errors
    ///
    /// Returns `WebSocket` if the open channel rejects the message.
    pub async fn send_chat(&self, text: &str) -> ClientResult<()> {
        self.transport.chat(text).await
    }

    /// Close the session: stop any active recording (best effort), stop
    /// playback, and tear down the transport. Idempotent.
    pub async fn disconnect(&self) {
        release_capture(&self.capture, &self.forward_handle, &self.recording).await;
        self.transport.disconnect().await;
    }

    // -------------------------------------------------------------------------
    // Callbacks
    // -------------------------------------------------------------------------

    /// Callback registration surface.
    #[must_use]
    pub fn events(&self) -> &SessionEvents {
        self.transport.events()
    }

    /// Register a callback for session-open events.
    pub fn on_connect(&self, callback: SessionIdCallback) {
        self.events().on_connect(callback);
    }

    /// Register a callback for session-close events.
    pub fn on_disconnect(&self, callback: NotifyCallback) {
        self.events().on_disconnect(callback);
    }

    /// Register a callback for speech-transcription text.
    pub fn on_stt_text(&self, callback: TextEventCallback) {
        self.events().on_stt_text(callback);
    }

    /// Register a callback for assistant response text.
    pub fn on_gpt_text(&self, callback: TextEventCallback) {
        self.events().on_gpt_text(callback);
    }

    /// Register a callback fired when a TTS unit arrives.
    pub fn on_tts_start(&self, callback: NotifyCallback) {
        self.events().on_tts_start(callback);
    }

    /// Register a callback fired when a TTS unit is done.
    pub fn on_tts_end(&self, callback: NotifyCallback) {
        self.events().on_tts_end(callback);
    }
}

/// Stop the capture stream, release the device, and wait for in-flight
/// frames to drain.
async fn release_capture(
    capture: &Mutex<Option<MicCapture>>,
    forward_handle: &Mutex<Option<JoinHandle<()>>>,
    recording: &AtomicBool,
) {
    recording.store(false, Ordering::SeqCst);

    let active = capture.lock().await.take();
    if let Some(mut active) = active {
        // Joining the capture thread blocks briefly; keep it off the
        // async workers
        let _ = tokio::task::spawn_blocking(move || active.stop()).await;
        tracing::info!("recording stopped");
    }

    // The forwarder ends once the capture side of the channel is gone
    let handle = forward_handle.lock().await.take();
    if let Some(handle) = handle {
        let _ = handle.await;
    }
}
