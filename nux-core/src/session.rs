//! `ConversationSession`: the listen → understand → act → respond cycle.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──on_wake()──► Listening ──utterance──► Processing ──commit──► Responding ──► Idle
//!                        │                        ▲
//!                        └──timeout──► Idle       └── handle_text() starts here
//!
//! cancel(): any state ──► Idle, nothing committed
//! ```
//!
//! One cycle at a time: a wake signal or typed command that arrives while a
//! cycle is in flight is rejected with `NuxError::Busy`.
//!
//! ## Cancellation
//!
//! Every cycle captures the session epoch when it starts. `cancel()` bumps
//! the epoch under the state lock and wakes the cycle. Memory commits happen
//! under the same lock after an epoch check, so a cancelled cycle can never
//! record an interaction. A dispatch already running on the blocking pool is
//! left to finish and its result is dropped.

use std::pin::Pin;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio::sync::futures::Notified;
use tracing::{debug, error, info, warn};

use crate::command::CommandResult;
use crate::error::{NuxError, Result};
use crate::intent::IntentClassifier;
use crate::ipc::events::{AssistantEvent, ConversationState};
use crate::ipc::EventHub;
use crate::memory::{ContextMemory, Interaction, MemoryConfig};
use crate::personality::{PersonalityResponder, ResponseKind};
use crate::router::CommandRouter;
use crate::skills::SkillContext;
use crate::voice::{SpeechRequest, SpeechSink, Transcriber};

/// Context memory shared between the session and anything that reads history.
pub type SharedMemory = Arc<Mutex<ContextMemory>>;

/// Configuration for `ConversationSession`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Longest wait for an utterance after a wake signal. Default: 5 s.
    pub capture_timeout: Duration,
    /// Hand rendered replies to the speech sink. Default: true.
    pub speak_responses: bool,
    /// Await speech delivery before returning to Idle. Default: false.
    pub wait_for_speech: bool,
    /// Recent commands passed to skills as context. Default: 5.
    pub skill_context_count: usize,
    pub memory: MemoryConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_timeout: Duration::from_secs(5),
            speak_responses: true,
            wait_for_speech: false,
            skill_context_count: 5,
            memory: MemoryConfig::default(),
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The command ran and this interaction was recorded.
    Completed(Interaction),
    /// No utterance arrived in time.
    TimedOut,
    /// `cancel()` was called; nothing was recorded.
    Cancelled,
}

pub struct ConversationSession {
    config: SessionConfig,
    classifier: IntentClassifier,
    router: Arc<CommandRouter>,
    memory: SharedMemory,
    responder: PersonalityResponder,
    hub: EventHub,
    transcriber: Arc<dyn Transcriber>,
    speech: Option<Arc<dyn SpeechSink>>,
    state: Mutex<ConversationState>,
    /// Bumped by every `cancel()`; a cycle whose epoch is stale must not commit.
    epoch: AtomicU64,
    cancel: Notify,
}

impl ConversationSession {
    /// Session with the built-in intent table, a fresh memory, the default
    /// persona and its own event hub. Use the `with_*` methods to swap parts.
    pub fn new(
        config: SessionConfig,
        router: Arc<CommandRouter>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Result<Self> {
        let memory = Arc::new(Mutex::new(ContextMemory::new(config.memory)));
        Ok(Self {
            config,
            classifier: IntentClassifier::new()?,
            router,
            memory,
            responder: PersonalityResponder::default(),
            hub: EventHub::new(),
            transcriber,
            speech: None,
            state: Mutex::new(ConversationState::Idle),
            epoch: AtomicU64::new(0),
            cancel: Notify::new(),
        })
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_memory(mut self, memory: SharedMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_responder(mut self, responder: PersonalityResponder) -> Self {
        self.responder = responder;
        self
    }

    pub fn with_hub(mut self, hub: EventHub) -> Self {
        self.hub = hub;
        self
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSink>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn state(&self) -> ConversationState {
        *self.state.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.hub.subscribe()
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn responder(&self) -> &PersonalityResponder {
        &self.responder
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handle a wake signal: listen for one utterance and run it.
    ///
    /// # Errors
    /// - `NuxError::Busy` if a cycle is already in flight.
    /// - The transcriber's error if capture fails. The session is back in
    ///   `Idle` either way.
    pub async fn on_wake(&self) -> Result<CycleOutcome> {
        let epoch = self.begin(ConversationState::Listening)?;
        info!("wake signal accepted");
        self.hub.publish(AssistantEvent::WakeWordDetected);
        self.publish_state(ConversationState::Listening);
        self.hub.publish(AssistantEvent::ListeningStarted);

        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();
        if self.is_stale(epoch) {
            return Ok(CycleOutcome::Cancelled);
        }

        let max = self.config.capture_timeout;
        let captured = tokio::select! {
            _ = &mut cancelled => return Ok(CycleOutcome::Cancelled),
            r = tokio::time::timeout(max, self.transcriber.capture(max)) => r,
        };

        let utterance = match captured {
            Ok(Ok(Some(utterance))) if !utterance.is_blank() => utterance,
            Ok(Ok(_)) | Err(_) => return Ok(self.time_out(epoch).await),
            Ok(Err(e)) => {
                self.fail(epoch, &e);
                return Err(e);
            }
        };

        self.process(epoch, utterance.text.trim().to_string(), cancelled)
            .await
    }

    /// Run an already-transcribed command, skipping capture.
    ///
    /// # Errors
    /// - `NuxError::Busy` if a cycle is already in flight.
    /// - `NuxError::InvalidParameter` for blank text.
    pub async fn handle_text(&self, text: &str) -> Result<CycleOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NuxError::InvalidParameter {
                name: "text".into(),
                reason: "empty command".into(),
            });
        }

        let epoch = self.begin(ConversationState::Processing)?;
        self.publish_state(ConversationState::Processing);

        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();
        if self.is_stale(epoch) {
            return Ok(CycleOutcome::Cancelled);
        }

        self.process(epoch, text.to_string(), cancelled).await
    }

    /// Abandon the in-flight cycle and return to `Idle`.
    ///
    /// Returns `false` if the session was already idle.
    pub fn cancel(&self) -> bool {
        let previous = {
            let mut state = self.state.lock();
            if *state == ConversationState::Idle {
                return false;
            }
            self.epoch.fetch_add(1, Ordering::SeqCst);
            std::mem::replace(&mut *state, ConversationState::Idle)
        };
        self.cancel.notify_waiters();
        info!(from = ?previous, "cycle cancelled");
        self.hub.publish(AssistantEvent::Cancelled);
        self.publish_state(ConversationState::Idle);
        true
    }

    // ── Cycle stages ──────────────────────────────────────────────────────

    async fn process(
        &self,
        epoch: u64,
        text: String,
        mut cancelled: Pin<&mut Notified<'_>>,
    ) -> Result<CycleOutcome> {
        if !self.transition(epoch, ConversationState::Processing) {
            return Ok(CycleOutcome::Cancelled);
        }
        info!(command = %text, "command received");
        self.hub.publish(AssistantEvent::CommandReceived {
            command: text.clone(),
        });

        let classification = self.classifier.parse(&text);
        let recent: Vec<String> = {
            let memory = self.memory.lock();
            memory
                .get_recent(
                    memory.config().context_window_minutes,
                    self.config.skill_context_count,
                )
                .into_iter()
                .map(|i| i.command)
                .collect()
        };
        let ctx = SkillContext::for_intent(&classification).with_recent(recent);

        let router = Arc::clone(&self.router);
        let (command, cls) = (text.clone(), classification.clone());
        let dispatch =
            tokio::task::spawn_blocking(move || router.route_with_context(&command, &cls, &ctx));

        let result = tokio::select! {
            _ = &mut cancelled => return Ok(CycleOutcome::Cancelled),
            joined = dispatch => joined.unwrap_or_else(|e| {
                error!("dispatch task failed: {e}");
                CommandResult::failure(format!("dispatch task failed: {e}"))
            }),
        };

        let response = if result.is_not_recognized() {
            debug!(intent = %classification.intent, "nothing claimed the command");
            self.responder.get_response(ResponseKind::UnknownCommand, None)
        } else {
            self.responder
                .format_command_response(&classification.intent, &result)
        };

        let interaction = Interaction {
            timestamp: Utc::now(),
            command: text,
            result: result.clone(),
            response: Some(response.clone()),
        };
        {
            let mut state = self.state.lock();
            if self.is_stale(epoch) {
                return Ok(CycleOutcome::Cancelled);
            }
            self.memory.lock().add_interaction_at(
                interaction.timestamp,
                interaction.command.clone(),
                result.clone(),
                interaction.response.clone(),
            );
            *state = ConversationState::Responding;
        }
        self.publish_state(ConversationState::Responding);
        info!(success = result.success, response = %response, "command handled");
        self.hub.publish(AssistantEvent::CommandResult {
            result,
            response: response.clone(),
        });

        // The interaction is already recorded; a cancel here only cuts speech short.
        tokio::select! {
            _ = &mut cancelled => {}
            _ = self.deliver_speech(response) => {}
        }

        self.transition(epoch, ConversationState::Idle);
        Ok(CycleOutcome::Completed(interaction))
    }

    async fn time_out(&self, epoch: u64) -> CycleOutcome {
        if self.is_stale(epoch) {
            return CycleOutcome::Cancelled;
        }
        let message = self.responder.get_response(ResponseKind::Timeout, None);
        info!("listening timed out");
        self.hub.publish(AssistantEvent::ListeningTimeout {
            message: message.clone(),
        });
        self.deliver_speech(message).await;
        if self.transition(epoch, ConversationState::Idle) {
            CycleOutcome::TimedOut
        } else {
            CycleOutcome::Cancelled
        }
    }

    fn fail(&self, epoch: u64, err: &NuxError) {
        error!("capture failed: {err}");
        self.hub.publish(AssistantEvent::Error {
            message: err.to_string(),
        });
        self.transition(epoch, ConversationState::Idle);
    }

    async fn deliver_speech(&self, text: String) {
        if !self.config.speak_responses {
            return;
        }
        let Some(sink) = self.speech.clone() else {
            return;
        };
        let request = SpeechRequest {
            text,
            wait: self.config.wait_for_speech,
        };
        if request.wait {
            if let Err(e) = sink.speak(request).await {
                warn!("speech delivery failed: {e}");
            }
        } else {
            tokio::spawn(async move {
                if let Err(e) = sink.speak(request).await {
                    warn!("speech delivery failed: {e}");
                }
            });
        }
    }

    // ── State helpers ─────────────────────────────────────────────────────

    fn begin(&self, target: ConversationState) -> Result<u64> {
        let mut state = self.state.lock();
        if *state != ConversationState::Idle {
            warn!(state = ?*state, "rejecting new cycle while busy");
            return Err(NuxError::Busy);
        }
        *state = target;
        Ok(self.epoch.load(Ordering::SeqCst))
    }

    /// Move to `target` unless the cycle was cancelled. Publishes only on change.
    fn transition(&self, epoch: u64, target: ConversationState) -> bool {
        {
            let mut state = self.state.lock();
            if self.is_stale(epoch) {
                return false;
            }
            if *state == target {
                return true;
            }
            *state = target;
        }
        self.publish_state(target);
        true
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }

    fn publish_state(&self, state: ConversationState) {
        debug!(?state, "state changed");
        self.hub.publish(AssistantEvent::StateChanged { state });
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
