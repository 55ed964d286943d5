//! Event callbacks exposed to the UI collaborator.
//!
//! The six session events mirror what a chat surface needs to render a
//! conversation: connection lifecycle, transcription text, assistant text,
//! and speech-playback bracketing. Callbacks are async and invoked from
//! the transport's dispatch task; registration can happen at any time and
//! replaces the previous callback.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;

/// Callback receiving the new session id on connect.
pub type SessionIdCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback receiving a text event plus its partial/final flag.
pub type TextEventCallback =
    Arc<dyn Fn(String, bool) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback for events that carry no payload.
pub type NotifyCallback = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

type Slot<T> = Arc<Mutex<Option<T>>>;

/// Registered callbacks for one session.
///
/// Cloning shares the underlying slots, so the transport task and the
/// command surface observe the same registrations.
#[derive(Default, Clone)]
pub struct SessionEvents {
    connect: Slot<SessionIdCallback>,
    disconnect: Slot<NotifyCallback>,
    stt_text: Slot<TextEventCallback>,
    gpt_text: Slot<TextEventCallback>,
    tts_start: Slot<NotifyCallback>,
    tts_end: Slot<NotifyCallback>,
    /// Internal hook run during channel teardown, before the disconnect
    /// callback; the controller uses it to release the capture device when
    /// the transport goes away on its own
    teardown: Slot<NotifyCallback>,
}

impl SessionEvents {
    /// Register a callback for session-open events.
    pub fn on_connect(&self, callback: SessionIdCallback) {
        *self.connect.lock() = Some(callback);
    }

    /// Register a callback for session-close events.
    pub fn on_disconnect(&self, callback: NotifyCallback) {
        *self.disconnect.lock() = Some(callback);
    }

    /// Register a callback for speech-transcription text.
    pub fn on_stt_text(&self, callback: TextEventCallback) {
        *self.stt_text.lock() = Some(callback);
    }

    /// Register a callback for assistant response text.
    pub fn on_gpt_text(&self, callback: TextEventCallback) {
        *self.gpt_text.lock() = Some(callback);
    }

    /// Register a callback fired when a TTS unit arrives.
    pub fn on_tts_start(&self, callback: NotifyCallback) {
        *self.tts_start.lock() = Some(callback);
    }

    /// Register a callback fired when a TTS unit is done.
    pub fn on_tts_end(&self, callback: NotifyCallback) {
        *self.tts_end.lock() = Some(callback);
    }

    pub(crate) fn set_teardown(&self, callback: NotifyCallback) {
        *self.teardown.lock() = Some(callback);
    }

    pub(crate) async fn emit_teardown(&self) {
        let cb = self.teardown.lock().clone();
        if let Some(cb) = cb {
            cb().await;
        }
    }

    pub(crate) async fn emit_connect(&self, session_id: &str) {
        let cb = self.connect.lock().clone();
        if let Some(cb) = cb {
            cb(session_id.to_string()).await;
        }
    }

    pub(crate) async fn emit_disconnect(&self) {
        let cb = self.disconnect.lock().clone();
        if let Some(cb) = cb {
            cb().await;
        }
    }

    pub(crate) async fn emit_stt_text(&self, text: String, partial: bool) {
        let cb = self.stt_text.lock().clone();
        if let Some(cb) = cb {
            cb(text, partial).await;
        }
    }

    pub(crate) async fn emit_gpt_text(&self, text: String, partial: bool) {
        let cb = self.gpt_text.lock().clone();
        if let Some(cb) = cb {
            cb(text, partial).await;
        }
    }

    pub(crate) async fn emit_tts_start(&self) {
        let cb = self.tts_start.lock().clone();
        if let Some(cb) = cb {
            cb().await;
        }
    }

    pub(crate) async fn emit_tts_end(&self) {
        let cb = self.tts_end.lock().clone();
        if let Some(cb) = cb {
            cb().await;
        }
    }
}
