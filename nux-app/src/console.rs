//! Console stand-ins for the microphone and the speaker.
//!
//! A single reader task forwards stdin lines into a channel. The main loop
//! and `StdinTranscriber` both pull from it, so the line typed after a wake
//! phrase becomes the captured utterance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nux_core::{AssistantEvent, Result, SpeechRequest, SpeechSink, Transcriber, Utterance};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

const LINE_QUEUE: usize = 32;

/// Receiving half of the stdin line channel, shared between the console loop
/// and the transcriber.
pub type Lines = Arc<Mutex<mpsc::Receiver<String>>>;

/// Start forwarding stdin lines. The channel closes on EOF.
pub fn spawn_stdin_reader() -> Lines {
    let (tx, rx) = mpsc::channel(LINE_QUEUE);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("stdin read failed: {e}");
                    break;
                }
            }
        }
        debug!("stdin reader finished");
    });
    Arc::new(Mutex::new(rx))
}

/// Next line, or `None` once stdin is closed.
pub async fn next_line(lines: &Lines) -> Option<String> {
    lines.lock().await.recv().await
}

pub struct StdinTranscriber {
    lines: Lines,
}

impl StdinTranscriber {
    pub fn new(lines: Lines) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl Transcriber for StdinTranscriber {
    async fn capture(&self, max: Duration) -> Result<Option<Utterance>> {
        let mut rx = self.lines.lock().await;
        match tokio::time::timeout(max, rx.recv()).await {
            Ok(Some(line)) => Ok(Some(Utterance::new(line))),
            Ok(None) | Err(_) => Ok(None),
        }
    }
}

/// Prints replies instead of synthesising audio.
pub struct ConsoleSpeech {
    name: String,
}

impl ConsoleSpeech {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn render(&self, text: &str) -> String {
        format!("{}: {text}", self.name)
    }
}

#[async_trait]
impl SpeechSink for ConsoleSpeech {
    async fn speak(&self, request: SpeechRequest) -> Result<()> {
        println!("{}", self.render(&request.text));
        Ok(())
    }
}

/// Event text worth printing. With speech on, the timeout phrase is
/// already spoken by the session, so nothing is echoed.
pub fn event_echo(event: &AssistantEvent, speaks: bool) -> Option<&str> {
    match event {
        AssistantEvent::ListeningTimeout { message } if !speaks => Some(message.as_str()),
        _ => None,
    }
}
