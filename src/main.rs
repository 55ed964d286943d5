use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vocalink::session::{TranscriptKind, TranscriptLog};
use vocalink::{ClientConfig, SessionController, SessionMode};

/// Vocalink - real-time voice chat streaming client
#[derive(Parser, Debug)]
#[command(name = "vocalink")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// WebSocket endpoint of the voice service
    #[arg(long = "server-url", value_name = "URL")]
    server_url: Option<String>,

    /// Session mode (realtime or legacy)
    #[arg(short = 'm', long = "mode")]
    mode: Option<SessionMode>,

    /// Chatbot to bind the session to
    #[arg(long = "chatbot-id")]
    chatbot_id: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_env()?,
    };
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(id) = cli.chatbot_id {
        config.chatbot_id = id;
    }
    config.validate()?;

    info!("vocalink client, {} mode, {}", config.mode, config.server_url);

    let controller = Arc::new(SessionController::new(config));
    let transcript = Arc::new(Mutex::new(TranscriptLog::new()));
    register_callbacks(&controller, &transcript);

    println!("commands: connect | record | stop | chat <text> | log | disconnect | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "connect" => {
                if let Err(e) = controller.connect().await {
                    error!("connect failed: {}", e);
                }
            }
            "record" => {
                if let Err(e) = controller.start_recording().await {
                    error!("start recording failed: {}", e);
                }
            }
            "stop" => {
                if let Err(e) = controller.stop_recording().await {
                    error!("stop recording failed: {}", e);
                }
            }
            "chat" => {
                let text = rest.trim();
                if !text.is_empty() {
                    transcript.lock().push(TranscriptKind::UserChat, text);
                }
                if let Err(e) = controller.send_chat(rest).await {
                    error!("chat failed: {}", e);
                }
            }
            "log" => {
                for entry in transcript.lock().entries() {
                    println!("{:?}\t{}", entry.kind, entry.text);
                }
            }
            "disconnect" => controller.disconnect().await,
            "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command: {other}"),
        }
    }

    controller.disconnect().await;
    Ok(())
}

/// Wire the six session events to the console transcript.
fn register_callbacks(controller: &Arc<SessionController>, transcript: &Arc<Mutex<TranscriptLog>>) {
    let log = Arc::clone(transcript);
    controller.on_connect(Arc::new(move |session_id| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            info!("connected, session {}", session_id);
            log.lock()
                .push(TranscriptKind::System, format!("Connected | session={session_id}"));
        })
    }));

    let log = Arc::clone(transcript);
    controller.on_disconnect(Arc::new(move || {
        let log = Arc::clone(&log);
        Box::pin(async move {
            info!("disconnected");
            log.lock().push(TranscriptKind::System, "Disconnected");
        })
    }));

    let log = Arc::clone(transcript);
    controller.on_stt_text(Arc::new(move |text, _partial| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            info!("stt: {}", text);
            log.lock().push_stt(&text);
        })
    }));

    let log = Arc::clone(transcript);
    controller.on_gpt_text(Arc::new(move |text, _partial| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            info!("assistant: {}", text);
            log.lock().push(TranscriptKind::Assistant, text);
        })
    }));

    let log = Arc::clone(transcript);
    controller.on_tts_start(Arc::new(move || {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().push(TranscriptKind::System, "TTS start");
        })
    }));

    let log = Arc::clone(transcript);
    controller.on_tts_end(Arc::new(move || {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().push(TranscriptKind::System, "TTS end");
        })
    }));
}
