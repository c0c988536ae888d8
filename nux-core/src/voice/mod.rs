//! Voice collaborators.
//!
//! The session never touches audio. It asks a `Transcriber` for one
//! utterance and hands rendered replies to a `SpeechSink`; wake-word
//! detection, STT and TTS engines live behind these two traits.

pub mod scripted;

pub use scripted::{RecordingSpeech, ScriptStep, ScriptedTranscriber};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One transcribed utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub text: String,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            captured_at: Utc::now(),
            confidence: None,
        }
    }

    /// Whitespace-only transcripts count as silence.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Contract for speech-to-text backends.
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Capture and transcribe one utterance lasting at most `max`.
    ///
    /// # Returns
    /// `Ok(None)` when nothing was heard. The session also enforces `max`
    /// itself, so an implementation that overruns is simply abandoned.
    async fn capture(&self, max: Duration) -> Result<Option<Utterance>>;
}

/// Text handed to the speech collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    /// `false` means fire-and-forget: the session does not await delivery.
    pub wait: bool,
}

/// Contract for text-to-speech backends.
#[async_trait]
pub trait SpeechSink: Send + Sync + 'static {
    async fn speak(&self, request: SpeechRequest) -> Result<()>;
}
