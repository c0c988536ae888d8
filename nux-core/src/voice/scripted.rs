//! Scripted collaborators.
//!
//! `ScriptedTranscriber` replays a fixed list of capture outcomes so the
//! whole listen/act/respond cycle can run without a microphone, and
//! `RecordingSpeech` keeps every request it is handed.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{NuxError, Result};
use crate::voice::{SpeechRequest, SpeechSink, Transcriber, Utterance};

/// One scripted capture outcome.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this text immediately.
    Say(String),
    /// Return this text after a delay.
    SayAfter(Duration, String),
    /// Nothing heard.
    Silence,
    /// Never return; the caller must time out or cancel.
    Hang,
    /// Capture backend failure.
    Fail(String),
}

impl ScriptStep {
    pub fn say(text: impl Into<String>) -> Self {
        Self::Say(text.into())
    }
}

/// Replays `ScriptStep`s in order; silence once exhausted.
#[derive(Debug, Default)]
pub struct ScriptedTranscriber {
    steps: Mutex<VecDeque<ScriptStep>>,
}

impl ScriptedTranscriber {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
        }
    }

    pub fn push(&self, step: ScriptStep) {
        self.steps.lock().push_back(step);
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn capture(&self, max: Duration) -> Result<Option<Utterance>> {
        let step = self.steps.lock().pop_front().unwrap_or(ScriptStep::Silence);
        debug!(?step, ?max, "scripted capture");
        match step {
            ScriptStep::Say(text) => Ok(Some(Utterance::new(text))),
            ScriptStep::SayAfter(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(Some(Utterance::new(text)))
            }
            ScriptStep::Silence => Ok(None),
            ScriptStep::Hang => std::future::pending().await,
            ScriptStep::Fail(msg) => Err(NuxError::Collaborator(msg)),
        }
    }
}

/// Speech sink that records requests instead of speaking them.
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<SpeechRequest>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<SpeechRequest> {
        self.spoken.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|r| r.text.clone()).collect()
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeech {
    async fn speak(&self, request: SpeechRequest) -> Result<()> {
        self.spoken.lock().push(request);
        Ok(())
    }
}
