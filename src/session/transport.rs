//! Duplex WebSocket session with the voice service.
//!
//! One [`TransportSession`] owns one WebSocket connection for its whole
//! lifetime. Immediately after the channel opens it sends the `config`
//! handshake; after that, audio frames go out as binary messages and
//! control messages as text, both through a single bounded channel drained
//! by the connection task, which also dispatches everything inbound.
//!
//! # Thread Safety
//!
//! All mutable state sits behind `Arc` wrappers shared with the spawned
//! connection task. The `connected` flag uses `Arc<AtomicBool>` for
//! lock-free checks on the frame send path.
//!
//! # Teardown
//!
//! `disconnect` is idempotent and safe from any state: it sends a
//! best-effort `disconnect` notice, closes the channel, and lets the
//! connection task run the single cleanup path. A transport error or a
//! server-side close runs the same path, so the disconnect callback fires
//! exactly once either way.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::events::SessionEvents;
use super::messages::{ClientMessage, ServerMessage};
use super::{ConnectionState, SessionMode};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::playback::{ClipPlayer, PcmStreamPlayer, PlaybackSink};

/// Channel capacity for outbound WebSocket messages.
const WS_CHANNEL_CAPACITY: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Outbound traffic: control messages as text, audio frames as binary,
/// plus an explicit close request from the command surface.
enum Outbound {
    Control(ClientMessage),
    Audio(Bytes),
    Close,
}

/// Client side of the duplex voice channel.
pub struct TransportSession {
    config: ClientConfig,
    /// Connection state
    state: Arc<RwLock<ConnectionState>>,
    /// Connected flag for fast checks (shared with the connection task)
    connected: Arc<AtomicBool>,
    /// Session id, regenerated on every connect, never reused
    session_id: Arc<RwLock<Option<String>>>,
    /// Sender feeding the connection task
    out_tx: Arc<Mutex<Option<mpsc::Sender<Outbound>>>>,
    /// Playback sink selected by mode at connect time
    sink: Arc<Mutex<Option<Arc<dyn PlaybackSink>>>>,
    /// Registered UI callbacks
    events: SessionEvents,
    /// Connection task handle
    connection_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Guard so the disconnect callback fires once per connection
    disconnect_notified: Arc<AtomicBool>,
}

impl TransportSession {
    /// Create a disconnected session for the given configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            connected: Arc::new(AtomicBool::new(false)),
            session_id: Arc::new(RwLock::new(None)),
            out_tx: Arc::new(Mutex::new(None)),
            sink: Arc::new(Mutex::new(None)),
            events: SessionEvents::default(),
            connection_handle: Arc::new(Mutex::new(None)),
            disconnect_notified: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Callback registration surface.
    #[must_use]
    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Session mode this transport was configured with.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.config.mode
    }

    /// Whether the channel is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Session id of the open connection, if any.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// Open the channel and perform the handshake.
    ///
    /// A no-op when already connected, so repeated calls handshake only
    /// once. On success the connect callback fires with the new session id.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the WebSocket connection cannot be
    /// established; the session stays disconnected.
    pub async fn connect(&self) -> ClientResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        *self.state.write().await = ConnectionState::Connecting;

        let ws_stream = match tokio_tungstenite::connect_async(self.config.server_url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ClientError::ConnectionFailed(e.to_string()));
            }
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!("connected to {} as session {}", self.config.server_url, session_id);

        let (ws_sink, ws_read) = ws_stream.split();
        let (tx, rx) = mpsc::channel::<Outbound>(WS_CHANNEL_CAPACITY);

        // One playback strategy per session, fixed by mode
        let sink: Arc<dyn PlaybackSink> = match self.config.mode {
            SessionMode::Realtime => Arc::new(PcmStreamPlayer::new()),
            SessionMode::Legacy => Arc::new(ClipPlayer::new()),
        };

        *self.out_tx.lock().await = Some(tx.clone());
        *self.session_id.write().await = Some(session_id.clone());
        *self.sink.lock().await = Some(Arc::clone(&sink));
        self.disconnect_notified.store(false, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Connected;

        let handle = tokio::spawn(connection_task(
            ws_sink,
            ws_read,
            rx,
            self.events.clone(),
            Arc::clone(&self.sink),
            Arc::clone(&self.connected),
            Arc::clone(&self.state),
            Arc::clone(&self.out_tx),
            Arc::clone(&self.session_id),
            Arc::clone(&self.disconnect_notified),
        ));
        *self.connection_handle.lock().await = Some(handle);

        // Handshake first: the channel is FIFO and was created empty, so
        // config is guaranteed to be the first message on the wire
        let handshake = ClientMessage::Config {
            session_id: session_id.clone(),
            sample_rate: self.config.sample_rate,
            client_sample_rate: self.config.client_sample_rate,
            mode: self.config.mode,
            chatbot_id: self.config.chatbot_id,
        };
        self.send_control(handshake).await?;

        self.events.emit_connect(&session_id).await;
        Ok(())
    }

    /// Send one audio frame, in production order.
    ///
    /// Fire-and-forget: when the channel is not open the frame is dropped
    /// silently, matching capture segments that outlive the connection.
    pub async fn send_audio(&self, frame: Bytes) {
        if !self.connected.load(Ordering::SeqCst) {
            return;
        }
        let tx = self.out_tx.lock().await.clone();
        if let Some(tx) = tx
            && tx.send(Outbound::Audio(frame)).await.is_err()
        {
            tracing::debug!("dropping audio frame: connection task gone");
        }
    }

    /// Send a chat message.
    ///
    /// A no-op when the channel is not open, no session id is set, or the
    /// trimmed text is empty.
    ///
    /// # Errors
    ///
    /// Returns `WebSocket` if the open channel rejects the message.
    pub async fn chat(&self, text: &str) -> ClientResult<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() || !self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        let Some(session_id) = self.session_id.read().await.clone() else {
            return Ok(());
        };

        self.send_control(ClientMessage::Chat {
            session_id,
            text: trimmed.to_string(),
            mode: self.config.mode,
        })
        .await
    }

    /// Send the legacy commit message ending a capture segment.
    ///
    /// A no-op when the channel is not open.
    ///
    /// # Errors
    ///
    /// Returns `WebSocket` if the open channel rejects the message.
    pub async fn commit(&self) -> ClientResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        let Some(session_id) = self.session_id.read().await.clone() else {
            return Ok(());
        };

        self.send_control(ClientMessage::Send { session_id }).await
    }

    /// Close the session.
    ///
    /// Stops playback, sends a best-effort `disconnect` notice, and closes
    /// the channel. Idempotent: calling it again after teardown is a no-op
    /// and the disconnect callback fires at most once per connection.
    pub async fn disconnect(&self) {
        // Stop whatever is playing before tearing the channel down
        let sink = self.sink.lock().await.take();
        if let Some(sink) = sink {
            sink.stop().await;
        }

        if !self.connected.load(Ordering::SeqCst) {
            return;
        }
        *self.state.write().await = ConnectionState::Closing;

        let session_id = self.session_id.read().await.clone().unwrap_or_default();
        let tx = self.out_tx.lock().await.clone();
        if let Some(tx) = tx {
            // Best-effort notice; the close frame ends the connection task
            // which runs the shared cleanup path
            let _ = tx
                .send(Outbound::Control(ClientMessage::Disconnect { session_id }))
                .await;
            let _ = tx.send(Outbound::Close).await;
        }

        let handle = self.connection_handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    async fn send_control(&self, message: ClientMessage) -> ClientResult<()> {
        let tx = self.out_tx.lock().await.clone();
        match tx {
            Some(tx) => tx
                .send(Outbound::Control(message))
                .await
                .map_err(|e| ClientError::WebSocket(e.to_string())),
            None => Err(ClientError::NotConnected),
        }
    }
}

/// The connection task: drains outbound traffic, dispatches inbound
/// messages, and runs the single cleanup path when the channel ends.
#[allow(clippy::too_many_arguments)]
async fn connection_task(
    mut ws_sink: WsSink,
    mut ws_read: WsSource,
    mut rx: mpsc::Receiver<Outbound>,
    events: SessionEvents,
    sink_slot: Arc<Mutex<Option<Arc<dyn PlaybackSink>>>>,
    connected: Arc<AtomicBool>,
    state: Arc<RwLock<ConnectionState>>,
    out_tx: Arc<Mutex<Option<mpsc::Sender<Outbound>>>>,
    session_id: Arc<RwLock<Option<String>>>,
    disconnect_notified: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            // Outbound: control as text, frames as binary
            Some(outbound) = rx.recv() => {
                match outbound {
                    Outbound::Control(message) => {
                        let json = match serde_json::to_string(&message) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!("failed to serialize control message: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("failed to send control message: {}", e);
                            break;
                        }
                    }
                    Outbound::Audio(frame) => {
                        if let Err(e) = ws_sink.send(Message::Binary(frame)).await {
                            tracing::error!("failed to send audio frame: {}", e);
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            // Inbound: text control events and binary TTS units
            Some(message) = ws_read.next() => {
                match message {
                    Ok(Message::Text(text)) => {
                        dispatch_text(&events, &text).await;
                    }
                    Ok(Message::Binary(data)) => {
                        dispatch_audio(&events, &sink_slot, data).await;
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("channel closed by server");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            tracing::error!("failed to send pong: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            else => break,
        }
    }

    // Single cleanup path for explicit disconnects, server closes, and
    // transport errors alike. Dropping the receiver first fails any sender
    // still waiting for capacity, so the teardown hook can never wait on a
    // send that will not complete.
    drop(rx);
    connected.store(false, Ordering::SeqCst);
    *state.write().await = ConnectionState::Disconnected;
    *out_tx.lock().await = None;
    *session_id.write().await = None;

    let sink = sink_slot.lock().await.take();
    if let Some(sink) = sink {
        sink.stop().await;
    }

    events.emit_teardown().await;
    if !disconnect_notified.swap(true, Ordering::SeqCst) {
        events.emit_disconnect().await;
    }
    tracing::info!("session connection task ended");
}

/// Parse and route one inbound control message.
async fn dispatch_text(events: &SessionEvents, text: &str) {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::SttText { text, partial }) => {
            events.emit_stt_text(text, partial).await;
        }
        Ok(ServerMessage::GptText { text, partial }) => {
            events.emit_gpt_text(text, partial).await;
        }
        Ok(ServerMessage::Unknown) => {
            tracing::debug!("ignoring unrecognized control message: {}", text);
        }
        Err(e) => {
            tracing::warn!("failed to parse control message: {} - {}", e, text);
        }
    }
}

/// Hand one complete TTS unit to the active sink, bracketed by the
/// start/end notifications.
///
/// Playback runs in its own task so a long clip never stalls inbound
/// dispatch; the end notification fires exactly once per unit, on the
/// success and failure paths alike.
async fn dispatch_audio(
    events: &SessionEvents,
    sink_slot: &Arc<Mutex<Option<Arc<dyn PlaybackSink>>>>,
    data: Bytes,
) {
    let sink = sink_slot.lock().await.clone();
    let Some(sink) = sink else {
        tracing::debug!("dropping {} byte TTS unit: no active sink", data.len());
        return;
    };

    let events = events.clone();
    tokio::spawn(async move {
        events.emit_tts_start().await;
        if let Err(e) = sink.play(data).await {
            tracing::error!("audio playback error: {}", e);
        }
        events.emit_tts_end().await;
    });
}
