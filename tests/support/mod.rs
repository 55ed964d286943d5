//! In-process mock voice service for protocol tests.
//!
//! Accepts WebSocket connections on a loopback port, records everything
//! the client sends, and pushes scripted messages back. Connections are
//! handled sequentially so one mock can observe a disconnect/reconnect
//! sequence end to end.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// One item the mock received from the client, in arrival order.
#[derive(Debug, Clone)]
pub enum Received {
    /// A JSON control message
    Control(serde_json::Value),
    /// A binary audio payload
    Audio(Vec<u8>),
    /// The connection ended
    Closed,
}

/// Handle to a running mock service.
pub struct MockVoiceService {
    addr: SocketAddr,
    received: mpsc::UnboundedReceiver<Received>,
    script: mpsc::UnboundedSender<Message>,
}

impl MockVoiceService {
    /// Bind a loopback port and start accepting connections.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock listener");
        let addr = listener.local_addr().expect("mock local addr");

        let (received_tx, received) = mpsc::unbounded_channel();
        let (script, mut script_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                if handle_connection(stream, &received_tx, &mut script_rx)
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            addr,
            received,
            script,
        }
    }

    /// `ws://` URL of the mock.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Queue a text message for the connected client.
    pub fn send_json(&self, value: serde_json::Value) {
        self.script
            .send(Message::Text(value.to_string().into()))
            .expect("script send");
    }

    /// Queue a raw (possibly malformed) text message.
    pub fn send_raw_text(&self, text: &str) {
        self.script
            .send(Message::Text(text.to_string().into()))
            .expect("script send");
    }

    /// Queue a binary audio unit.
    pub fn send_binary(&self, data: Vec<u8>) {
        self.script
            .send(Message::Binary(data.into()))
            .expect("script send");
    }

    /// Close the current connection from the server side.
    pub fn close_connection(&self) {
        self.script
            .send(Message::Close(None))
            .expect("script send");
    }

    /// Next received item, or panic after a generous timeout.
    pub async fn recv(&mut self) -> Received {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .expect("timed out waiting for the client")
            .expect("mock channel closed")
    }

    /// Next received item that is a control message.
    pub async fn recv_control(&mut self) -> serde_json::Value {
        loop {
            match self.recv().await {
                Received::Control(value) => return value,
                Received::Audio(_) => {}
                Received::Closed => panic!("connection closed while expecting a control message"),
            }
        }
    }

    /// Next received item that is an audio payload.
    pub async fn recv_audio(&mut self) -> Vec<u8> {
        loop {
            match self.recv().await {
                Received::Audio(data) => return data,
                Received::Control(_) => {}
                Received::Closed => panic!("connection closed while expecting audio"),
            }
        }
    }

    /// True if nothing more arrives within `window`.
    pub async fn quiet_for(&mut self, window: Duration) -> bool {
        tokio::time::timeout(window, self.received.recv())
            .await
            .is_err()
    }
}

async fn handle_connection(
    stream: TcpStream,
    received_tx: &mpsc::UnboundedSender<Received>,
    script_rx: &mut mpsc::UnboundedReceiver<Message>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            Some(outbound) = script_rx.recv() => {
                let closing = matches!(outbound, Message::Close(_));
                write.send(outbound).await?;
                if closing {
                    // Keep draining until the client acknowledges the close
                    continue;
                }
            }

            inbound = read.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let value = serde_json::from_str(&text)
                            .unwrap_or_else(|_| serde_json::json!({ "raw": text.as_str() }));
                        let _ = received_tx.send(Received::Control(value));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let _ = received_tx.send(Received::Audio(data.to_vec()));
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = received_tx.send(Received::Closed);
                        return Ok(());
                    }
                    Some(Err(_)) => {
                        let _ = received_tx.send(Received::Closed);
                        return Ok(());
                    }
                    _ => {}
                }
            }

            else => return Ok(()),
        }
    }
}
