use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use murmur::clipboard::SystemClipboard;
use murmur::export::{DirectorySink, ExportKind};
use murmur::session::Session;
use murmur::speech::NullSpeech;
use murmur::{APP_NAME_PRETTY, BackendClient, ConfigManager, DEFAULT_LOG_LEVEL, MicBackend, VERSION};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MURMUR_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .init();

    // Load config
    let config_manager = ConfigManager::new()?;
    let config = config_manager.load()?;
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config)?;

    let backend_url = config.backend_url();
    info!(backend_url = %backend_url, "murmur starting");

    // Wire up the session and its collaborators
    let backend = Arc::new(BackendClient::from_base_url(backend_url));
    let sink = match config.export_dir() {
        Some(dir) => DirectorySink::new(dir),
        None => DirectorySink::downloads(),
    };
    let clipboard = SystemClipboard::new().context("Failed to open system clipboard")?;
    let session = Session::new(
        Arc::new(MicBackend::new()),
        backend,
        Box::new(sink),
        Box::new(clipboard),
        Box::new(NullSpeech),
    );

    println!("{APP_NAME_PRETTY} {VERSION} (type `help` for commands)");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "record" => {
                session.start_recording().await;
                println!("state: {:?}", session.capture_state());
            }
            "stop" => {
                session.stop_and_transcribe().await;
                println!("{}", session.transcript_text());
            }
            "file" => {
                if rest.is_empty() {
                    println!("usage: file <path>");
                } else {
                    session.transcribe_file(Path::new(rest)).await;
                    println!("{}", session.transcript_text());
                }
            }
            "copy" => session.copy_transcript(),
            "speak" => session.speak_transcript(),
            "edit" => session.edit_text(rest),
            "clear" => session.clear(),
            "dismiss" => session.dismiss_error(),
            "export" => {
                let kind = match rest {
                    "srt" => Some(ExportKind::Srt),
                    "vtt" => Some(ExportKind::Vtt),
                    "timestamped" => Some(ExportKind::Timestamped),
                    "text" | "txt" => Some(ExportKind::PlainText),
                    _ => {
                        println!("usage: export srt|vtt|timestamped|text");
                        None
                    }
                };
                if let Some(kind) = kind {
                    if let Some(path) = session.export(kind) {
                        println!("saved {}", path.display());
                    }
                }
            }
            "pdf" => {
                if let Some(path) = session.export_pdf().await {
                    println!("saved {}", path.display());
                }
            }
            "show" => {
                println!("state: {:?}", session.capture_state());
                println!("segments: {}", session.segments().len());
                println!("{}", session.transcript_text());
            }
            "help" => {
                println!("record            start recording from the microphone");
                println!("stop              stop recording and transcribe the clip");
                println!("file <path>       transcribe an audio/video file");
                println!("copy              copy the transcript to the clipboard");
                println!("speak             toggle speech synthesis of the transcript");
                println!("edit <text>       replace the transcript text");
                println!("export <format>   save as srt|vtt|timestamped|text");
                println!("pdf               save the transcript as a PDF");
                println!("show              print session state and transcript");
                println!("clear             reset transcript and error");
                println!("dismiss           clear the current error");
                println!("quit              exit");
            }
            "quit" | "exit" => break,
            other => println!("unknown command: {other}"),
        }

        if let Some(error) = session.last_error() {
            println!("error: {error}");
        }
    }

    Ok(())
}
